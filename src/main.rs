//! The `vex` binary: a `termion` terminal front-end plus the default
//! keymap, wired around the `vex` library's mainloop primitives. Window
//! layout, terminal rendering polish, and the shipped key bindings are all
//! explicit Non-goals of the library itself (§1) — this is where a concrete
//! choice for each of them lives.

use std::cell::RefCell;
use std::io::{self, BufWriter, Read, Stdin, Stdout, Write};
use std::os::fd::{AsFd, AsRawFd, RawFd};
use std::path::PathBuf;
use std::rc::Rc;
use std::time::{Duration, Instant};

use polling::{Event, Events, Poller};
use termion::cursor::{BlinkingBar, BlinkingBlock, Goto};
use termion::event::Key as TKey;
use termion::input::{Keys, TermRead};
use termion::raw::{IntoRawMode, RawTerminal};
use termion::screen::{ToAlternateScreen, ToMainScreen};

use vex::cli::{self, Args, StartupCommand};
use vex::config::Config;
use vex::editor::{Editor, PromptKind};
use vex::key::{Key, NamedKey};
use vex::mode::{Binding, ModeGraph, ModeId};
use vex::motion::MotionId;
use vex::operator::{OperatorArg, OperatorId, PutAnchor};
use vex::signal;
use vex::textobject::TextObjectId;
use vex::ui::{CursorStyle, Ui};
use vex::window::{FileRegistry, Window};

/// Value the `stdin` source is registered under; distinguishes it from any
/// other fd a future `Ui` might also register (mirrors the teacher's own
/// arbitrary-constant convention).
const STDIN_EVENT_KEY: usize = 25663;
/// Ceiling on how long a single `poller.wait` blocks, so a resize is never
/// more than this stale and an idle-timeout deadline is never missed by
/// more than this much.
const POLL_TICK: Duration = Duration::from_millis(200);

fn main() -> io::Result<()> {
    tracing_subscriber::fmt().with_writer(io::stderr).init();

    let mut argv = std::env::args();
    argv.next();
    let run = match cli::parse(argv.collect::<Vec<_>>()) {
        Args::PrintVersion => {
            println!("vex {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Args::Run(run) => run,
    };

    let mut files = FileRegistry::new();
    let path = run.files.first().map(PathBuf::from);
    let file_id = files.open(path.as_deref()).map_err(to_io_error)?;
    let file = files.get(file_id).expect("just opened");

    if run.read_stdin {
        let mut buf = Vec::new();
        io::stdin().read_to_end(&mut buf)?;
        file.borrow_mut().text = Box::new(vex::text::SimpleText::new(buf));
        reattach_tty_stdin()?;
    }

    let config = Config::default();
    let ui = TermionUi::new()?;
    let window = Window::new(file_id, file, Box::new(ui), &config);
    let mut editor = Editor::new(files, window, config);
    editor.modes = build_default_modes();

    for cmd in &run.startup_commands {
        match cmd {
            StartupCommand::Ex(cmd) => {
                if let Err(err) = editor.ex(cmd) {
                    editor.status = err.to_string();
                }
            }
            StartupCommand::SearchForward(pat) => {
                editor.search.last_pattern = Some(pat.clone());
                editor.do_motion(MotionId::SearchForward);
            }
            StartupCommand::SearchBackward(pat) => {
                editor.search.last_pattern = Some(pat.clone());
                editor.do_motion(MotionId::SearchBackward);
            }
        }
    }

    unsafe { signal::install() };

    let stdin = io::stdin();
    let stdin_fd = stdin.as_fd();
    let poller = Poller::new()?;
    unsafe { poller.add(&stdin_fd, Event::readable(STDIN_EVENT_KEY))? };
    let mut events = Events::new();

    let mut last_size = (0u16, 0u16);
    let mut last_activity = Instant::now();
    redraw(&mut editor)?;

    while !editor.quit {
        let size = termion::terminal_size()?;
        if size != last_size {
            editor.window.ui.resize(size.0, size.1);
            last_size = size;
        }

        events.clear();
        poller.wait(&mut events, Some(POLL_TICK))?;

        if signal::take_sigbus() {
            handle_sigbus(&mut editor);
        }
        if signal::cancel_requested() && editor.mode == ModeId::Normal {
            editor.pending.reset();
        }

        if events.iter().any(|e| e.key == STDIN_EVENT_KEY) {
            if let Some(key) = editor.window.ui.getkey()? {
                editor.feed(&key.canonical());
            }
            last_activity = Instant::now();
            poller.modify(stdin_fd, Event::readable(STDIN_EVENT_KEY))?;
        } else if matches!(editor.mode, ModeId::Insert | ModeId::Replace)
            && last_activity.elapsed() >= Duration::from_secs(editor.config.idle_timeout_secs.max(1))
        {
            editor.idle_tick();
            last_activity = Instant::now();
        }

        redraw(&mut editor)?;
    }

    editor.window.ui.hide_prompt().ok();
    Ok(())
}

fn to_io_error(err: vex::error::EditorError) -> io::Error {
    io::Error::other(err.to_string())
}

/// `-` CLI mode (§6) reads the whole of stdin into the buffer, then points
/// fd 0 back at the controlling terminal so the key reader has something to
/// poll.
fn reattach_tty_stdin() -> io::Result<()> {
    use std::os::fd::AsRawFd;
    let tty = std::fs::File::open("/dev/tty")?;
    let rc = unsafe { libc::dup2(tty.as_raw_fd(), io::stdin().as_raw_fd()) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

fn handle_sigbus(editor: &mut Editor) {
    let name = editor
        .window
        .file
        .borrow()
        .path
        .as_deref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "[No Name]".to_string());
    editor.window.file.borrow_mut().mark_truncated();
    editor.window.ui.die(&format!("{name}: truncated on disk, quitting"));
    editor.quit();
}

fn redraw(editor: &mut Editor) -> io::Result<()> {
    let (lines, row, col) = {
        let file = editor.window.file.borrow();
        let text = file.text.as_bytes();
        let lines: Vec<String> = String::from_utf8_lossy(&text).split('\n').map(str::to_string).collect();
        let pos = editor.window.view.primary().pos;
        let row = file.text.lineno_by_pos(pos);
        let col = pos - file.text.line_start(pos);
        (lines, row, col)
    };
    editor.window.ui.redraw(&lines, (row, col))?;

    let style = match editor.mode {
        ModeId::Insert => CursorStyle::Bar,
        ModeId::Replace => CursorStyle::Underline,
        _ => CursorStyle::Block,
    };
    editor.window.ui.set_cursor_style(style);

    if editor.mode == ModeId::Prompt {
        let prefix = match editor.prompt_kind {
            Some(PromptKind::SearchForward) => '/',
            Some(PromptKind::SearchBackward) => '?',
            _ => ':',
        };
        editor.window.ui.show_prompt(&format!("{prefix}{}", editor.status))?;
    } else {
        editor.window.ui.hide_prompt().ok();
        editor.window.ui.draw_status(&status_line(editor))?;
    }
    Ok(())
}

fn status_line(editor: &Editor) -> String {
    let mode = match editor.mode {
        ModeId::Normal => "NORMAL",
        ModeId::Insert => "INSERT",
        ModeId::Replace => "REPLACE",
        ModeId::Visual => "VISUAL",
        ModeId::VisualLine => "VISUAL LINE",
        _ => "NORMAL",
    };
    let name = editor
        .window
        .file
        .borrow()
        .path
        .as_deref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "[No Name]".to_string());
    let multi = if editor.window.view.is_multi() {
        format!(" {}x", editor.window.view.len())
    } else {
        String::new()
    };
    let recording = if editor.macros.is_recording() { " recording" } else { "" };
    if editor.status.is_empty() {
        format!("-- {mode} -- {name}{multi}{recording}")
    } else {
        format!("-- {mode} -- {name}{multi}{recording} | {}", editor.status)
    }
}

/// The `termion`-backed `Ui` (§6): raw mode plus the alternate screen,
/// rendering in the `print_screen`-style single write-per-frame shape.
struct TermionUi {
    stdout: BufWriter<RawTerminal<Stdout>>,
    keys: Keys<Stdin>,
    width: u16,
    height: u16,
    cursor_style: CursorStyle,
    prompt: Option<String>,
    info: Option<String>,
}

impl TermionUi {
    fn new() -> io::Result<Self> {
        let mut stdout = BufWriter::new(io::stdout().into_raw_mode()?);
        let (width, height) = termion::terminal_size()?;
        write!(stdout, "{ToAlternateScreen}")?;
        stdout.flush()?;
        Ok(Self {
            stdout,
            keys: io::stdin().keys(),
            width,
            height,
            cursor_style: CursorStyle::Block,
            prompt: None,
            info: None,
        })
    }

    fn bottom_line(&self) -> Option<&str> {
        self.prompt.as_deref().or(self.info.as_deref())
    }
}

impl Drop for TermionUi {
    fn drop(&mut self) {
        let _ = write!(self.stdout, "{ToMainScreen}");
        let _ = self.stdout.flush();
    }
}

impl Ui for TermionUi {
    fn redraw(&mut self, lines: &[String], cursor: (usize, usize)) -> io::Result<()> {
        let rows = self.height.saturating_sub(1).max(1) as usize;
        let cols = self.width as usize;
        write!(self.stdout, "{}{}", termion::clear::All, Goto(1, 1))?;
        for line in lines.iter().take(rows) {
            let clipped: String = line.chars().take(cols).collect();
            write!(self.stdout, "{clipped}\n\r")?;
        }
        let (row, col) = cursor;
        let goto = Goto((col + 1).min(self.width as usize) as u16, (row + 1).min(self.height as usize) as u16);
        match self.cursor_style {
            CursorStyle::Block => write!(self.stdout, "{goto}{BlinkingBlock}")?,
            CursorStyle::Bar | CursorStyle::Underline => write!(self.stdout, "{goto}{BlinkingBar}")?,
        }
        self.stdout.flush()
    }

    fn draw_status(&mut self, message: &str) -> io::Result<()> {
        let clipped: String = message.chars().take(self.width as usize).collect();
        write!(self.stdout, "{}{clipped}", Goto(1, self.height))?;
        self.stdout.flush()
    }

    fn set_cursor_style(&mut self, style: CursorStyle) {
        self.cursor_style = style;
    }

    fn resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
    }

    fn show_prompt(&mut self, prompt: &str) -> io::Result<()> {
        self.prompt = Some(prompt.to_string());
        let line = self.bottom_line().unwrap_or("").to_string();
        self.draw_status(&line)
    }

    fn hide_prompt(&mut self) -> io::Result<()> {
        self.prompt = None;
        Ok(())
    }

    fn show_info(&mut self, message: &str) -> io::Result<()> {
        self.info = Some(message.to_string());
        Ok(())
    }

    fn hide_info(&mut self) -> io::Result<()> {
        self.info = None;
        Ok(())
    }

    fn getkey(&mut self) -> io::Result<Option<Key>> {
        match self.keys.next() {
            None => Ok(None),
            Some(Err(err)) => Err(err),
            Some(Ok(key)) => Ok(convert_key(key)),
        }
    }

    fn input_fd(&self) -> RawFd {
        io::stdin().as_raw_fd()
    }

    fn suspend(&mut self) -> io::Result<()> {
        write!(self.stdout, "{ToMainScreen}")?;
        self.stdout.flush()?;
        self.stdout.get_mut().suspend_raw_mode()?;
        unsafe { libc::raise(libc::SIGTSTP) };
        self.stdout.get_mut().activate_raw_mode()?;
        write!(self.stdout, "{ToAlternateScreen}")?;
        self.stdout.flush()
    }

    fn die(&mut self, message: &str) {
        let _ = write!(self.stdout, "{ToMainScreen}");
        let _ = self.stdout.flush();
        eprintln!("vex: {message}");
    }
}

/// Translates a `termion` key event into the key reader's own [`Key`]. Enter
/// arrives as `Char('\n')`/`Char('\r')` in raw mode rather than a dedicated
/// variant, so those two are folded into `Named(Enter)` here rather than in
/// the tokenizer (which only ever sees the canonical `<Enter>` spelling).
fn convert_key(key: TKey) -> Option<Key> {
    Some(match key {
        TKey::Char('\n') | TKey::Char('\r') => Key::Named(NamedKey::Enter),
        TKey::Char('\t') => Key::Named(NamedKey::Tab),
        TKey::Char(c) => Key::Char(c),
        TKey::Alt(c) => Key::Alt(c),
        TKey::Ctrl(c) => Key::Ctrl(c),
        TKey::Esc => Key::Named(NamedKey::Esc),
        TKey::Backspace => Key::Named(NamedKey::Backspace),
        TKey::Left => Key::Named(NamedKey::Left),
        TKey::Right => Key::Named(NamedKey::Right),
        TKey::Up => Key::Named(NamedKey::Up),
        TKey::Down => Key::Named(NamedKey::Down),
        TKey::Home => Key::Named(NamedKey::Home),
        TKey::End => Key::Named(NamedKey::End),
        TKey::PageUp => Key::Named(NamedKey::PageUp),
        TKey::PageDown => Key::Named(NamedKey::PageDown),
        TKey::BackTab => Key::Named(NamedKey::BackTab),
        TKey::Delete => Key::Named(NamedKey::Delete),
        TKey::Insert => Key::Named(NamedKey::Insert),
        TKey::F(n) => Key::Named(NamedKey::Function(n)),
        _ => return None,
    })
}

// ---- the default keymap ---------------------------------------------------

type Act = std::rc::Rc<dyn Fn(&mut Editor, &str) -> String>;

fn act(f: impl Fn(&mut Editor, &str) -> String + 'static) -> Act {
    Rc::new(f)
}

fn motion(id: MotionId) -> Act {
    act(move |ed, rest| {
        ed.do_motion(id);
        rest.to_string()
    })
}

fn textobject(id: TextObjectId, outer: bool) -> Act {
    act(move |ed, rest| {
        ed.do_textobject(id, outer);
        rest.to_string()
    })
}

fn start_op(id: OperatorId) -> Act {
    act(move |ed, rest| {
        ed.start_operator(id);
        rest.to_string()
    })
}

fn doubled(id: OperatorId) -> Act {
    act(move |ed, rest| {
        ed.run_doubled_linewise(id);
        rest.to_string()
    })
}

fn charwise_op_with_motion(op: OperatorId, m: MotionId) -> Act {
    act(move |ed, rest| {
        ed.start_operator(op);
        ed.do_motion(m);
        rest.to_string()
    })
}

fn visual_op(op: OperatorId, arg: Option<OperatorArg>) -> Act {
    act(move |ed, rest| {
        ed.run_visual_operator(op, arg);
        rest.to_string()
    })
}

fn case_change_with_motion(arg: OperatorArg, m: MotionId) -> Act {
    act(move |ed, rest| {
        ed.pending.arg = Some(arg);
        ed.start_operator(OperatorId::CaseChange);
        ed.do_motion(m);
        rest.to_string()
    })
}

fn case_change_doubled(arg: OperatorArg) -> Act {
    act(move |ed, rest| {
        ed.pending.arg = Some(arg);
        ed.run_doubled_linewise(OperatorId::CaseChange);
        rest.to_string()
    })
}

/// Assembles the default vi-like mode graph (§3's Non-goal on a shipped
/// binding table leaves this entirely to the binary). Counts, registers,
/// macros, marks and find/till-char all accumulate onto `editor.pending`
/// the same way regardless of which mode they're bound in, per §4.1.
fn build_default_modes() -> ModeGraph {
    let mut g = ModeGraph::new();
    bind_move(&mut g);
    bind_textobjects_into(&mut g, ModeId::TextObj);
    bind_textobjects_into(&mut g, ModeId::Visual);
    bind_textobjects_into(&mut g, ModeId::VisualLine);
    bind_normal(&mut g);
    bind_visual(&mut g);
    bind_visual_line(&mut g);
    bind_insert(&mut g);
    bind_replace(&mut g);
    bind_prompt(&mut g);
    g
}

fn bind_move(g: &mut ModeGraph) {
    use ModeId::Move;
    g.bind_action(Move, "h", motion(MotionId::Left));
    g.bind_action(Move, "l", motion(MotionId::Right));
    g.bind_action(Move, "<Left>", motion(MotionId::Left));
    g.bind_action(Move, "<Right>", motion(MotionId::Right));
    g.bind_action(Move, "j", motion(MotionId::Down));
    g.bind_action(Move, "k", motion(MotionId::Up));
    g.bind_action(Move, "<Down>", motion(MotionId::Down));
    g.bind_action(Move, "<Up>", motion(MotionId::Up));

    g.bind_action(Move, "w", motion(MotionId::WordForward));
    g.bind_action(Move, "b", motion(MotionId::WordBackward));
    g.bind_action(Move, "e", motion(MotionId::WordEndForward));
    g.bind_action(Move, "ge", motion(MotionId::WordEndBackward));
    g.bind_action(Move, "W", motion(MotionId::BigWordForward));
    g.bind_action(Move, "B", motion(MotionId::BigWordBackward));
    g.bind_action(Move, "E", motion(MotionId::BigWordEndForward));

    g.bind_action(Move, "^", motion(MotionId::LineFirstNonBlank));
    g.bind_action(Move, "$", motion(MotionId::LineEnd));
    g.bind_action(Move, "<Home>", motion(MotionId::LineStart));
    g.bind_action(Move, "<End>", motion(MotionId::LineEnd));
    g.bind_action(
        Move,
        "0",
        act(|ed, rest| {
            if ed.pending.count.is_none() {
                ed.do_motion(MotionId::LineStart);
            } else {
                ed.pending.push_count_digit(0);
            }
            rest.to_string()
        }),
    );
    for d in 1..=9u32 {
        let ch = char::from_digit(d, 10).unwrap().to_string();
        g.bind_action(
            Move,
            ch,
            act(move |ed, rest| {
                ed.pending.push_count_digit(d);
                rest.to_string()
            }),
        );
    }

    g.bind_action(Move, "G", motion(MotionId::GotoLine));
    g.bind_action(
        Move,
        "gg",
        act(|ed, rest| {
            if ed.pending.count.is_none() {
                ed.pending.count = Some(1);
            }
            ed.do_motion(MotionId::GotoLine);
            rest.to_string()
        }),
    );

    g.bind_action(
        Move,
        "f",
        act(|ed, rest| {
            ed.await_find_char(MotionId::FindCharForward);
            rest.to_string()
        }),
    );
    g.bind_action(
        Move,
        "F",
        act(|ed, rest| {
            ed.await_find_char(MotionId::FindCharBackward);
            rest.to_string()
        }),
    );
    g.bind_action(
        Move,
        "t",
        act(|ed, rest| {
            ed.await_find_char(MotionId::TillCharForward);
            rest.to_string()
        }),
    );
    g.bind_action(
        Move,
        "T",
        act(|ed, rest| {
            ed.await_find_char(MotionId::TillCharBackward);
            rest.to_string()
        }),
    );
    g.bind_action(Move, ";", motion(MotionId::RepeatFind));
    g.bind_action(Move, ",", motion(MotionId::RepeatFindOpposite));
    g.bind_action(Move, "%", motion(MotionId::MatchingBracket));
    g.bind_action(Move, "{", motion(MotionId::ParagraphBackward));
    g.bind_action(Move, "}", motion(MotionId::ParagraphForward));
    g.bind_action(Move, "*", motion(MotionId::WordUnderCursorForward));
    g.bind_action(Move, "#", motion(MotionId::WordUnderCursorBackward));
    g.bind_action(Move, "n", motion(MotionId::SearchNext));
    g.bind_action(Move, "N", motion(MotionId::SearchPrev));
    g.bind_action(
        Move,
        "`",
        act(|ed, rest| {
            ed.await_goto_mark(MotionId::MarkGoto);
            rest.to_string()
        }),
    );
    g.bind_action(
        Move,
        "'",
        act(|ed, rest| {
            ed.await_goto_mark(MotionId::MarkGotoLine);
            rest.to_string()
        }),
    );
}

/// The same text-object bindings are installed into `TEXTOBJ` (so `diw`,
/// `ya(`, ... resolve through `OPERATOR`'s retargeted parent chain, §4.2)
/// and directly into `VISUAL`/`VISUAL_LINE` (so `viw` selects a text object
/// without an operator ever being pending, per `action_do`'s
/// `was_visual`-textobject branch).
fn bind_textobjects_into(g: &mut ModeGraph, mode: ModeId) {
    let pairs: [(&str, &str, TextObjectId); 11] = [
        ("iw", "aw", TextObjectId::Word),
        ("iW", "aW", TextObjectId::BigWord),
        ("is", "as", TextObjectId::Sentence),
        ("ip", "ap", TextObjectId::Paragraph),
        ("i(", "a(", TextObjectId::Paren),
        ("i[", "a[", TextObjectId::Bracket),
        ("i{", "a{", TextObjectId::Brace),
        ("i<", "a<", TextObjectId::Angle),
        ("i\"", "a\"", TextObjectId::DoubleQuote),
        ("i'", "a'", TextObjectId::SingleQuote),
        ("i`", "a`", TextObjectId::Backtick),
    ];
    for (inner, outer, id) in pairs {
        g.bind_action(mode, inner, textobject(id, false));
        g.bind_action(mode, outer, textobject(id, true));
    }
    // `b`/`B` alias the paren/brace pairs, the familiar vi-like shorthand.
    g.bind_action(mode, "ib", textobject(TextObjectId::Paren, false));
    g.bind_action(mode, "ab", textobject(TextObjectId::Paren, true));
    g.bind_action(mode, "iB", textobject(TextObjectId::Brace, false));
    g.bind_action(mode, "aB", textobject(TextObjectId::Brace, true));
    g.bind_action(mode, ")", textobject(TextObjectId::Paren, true));
    g.bind_action(mode, "}", textobject(TextObjectId::Brace, true));

    g.bind_action(mode, "ie", textobject(TextObjectId::File, false));
    g.bind_action(mode, "ae", textobject(TextObjectId::File, true));
    g.bind_action(mode, "if", textobject(TextObjectId::Function, false));
    g.bind_action(mode, "af", textobject(TextObjectId::Function, true));
    g.bind_action(mode, "il", textobject(TextObjectId::Line, false));
    g.bind_action(mode, "al", textobject(TextObjectId::Line, true));
}

fn bind_normal(g: &mut ModeGraph) {
    use ModeId::Normal;

    g.bind_action(
        Normal,
        "i",
        act(|ed, rest| {
            ed.start_operator(OperatorId::Insert);
            ed.do_motion(MotionId::Nop);
            rest.to_string()
        }),
    );
    g.bind_action(
        Normal,
        "I",
        act(|ed, rest| {
            ed.start_operator(OperatorId::Insert);
            ed.do_motion(MotionId::LineFirstNonBlank);
            rest.to_string()
        }),
    );
    g.bind_action(
        Normal,
        "a",
        act(|ed, rest| {
            ed.start_operator(OperatorId::Insert);
            ed.do_motion(MotionId::Right);
            rest.to_string()
        }),
    );
    g.bind_action(
        Normal,
        "A",
        act(|ed, rest| {
            ed.start_operator(OperatorId::Insert);
            ed.do_motion(MotionId::LineEnd);
            ed.window.view.primary_mut().pos =
                { let f = ed.window.file.borrow(); f.text.line_finish(ed.window.view.primary().pos) };
            rest.to_string()
        }),
    );
    g.bind_action(
        Normal,
        "o",
        act(|ed, rest| {
            let pos = ed.window.view.primary().pos;
            let at = { let f = ed.window.file.borrow(); f.text.line_finish(pos) };
            { ed.window.file.borrow_mut().text.insert(at, b"\n"); }
            ed.window.view.primary_mut().pos = at + 1;
            ed.start_operator(OperatorId::Insert);
            ed.do_motion(MotionId::Nop);
            rest.to_string()
        }),
    );
    g.bind_action(
        Normal,
        "O",
        act(|ed, rest| {
            let pos = ed.window.view.primary().pos;
            let at = { let f = ed.window.file.borrow(); f.text.line_start(pos) };
            { ed.window.file.borrow_mut().text.insert(at, b"\n"); }
            ed.window.view.primary_mut().pos = at;
            ed.start_operator(OperatorId::Insert);
            ed.do_motion(MotionId::Nop);
            rest.to_string()
        }),
    );
    g.bind_action(
        Normal,
        "R",
        act(|ed, rest| {
            ed.start_operator(OperatorId::Replace);
            ed.do_motion(MotionId::Nop);
            rest.to_string()
        }),
    );

    g.bind_action(Normal, "v", act(|ed, rest| { ed.enter_visual(false); rest.to_string() }));
    g.bind_action(Normal, "V", act(|ed, rest| { ed.enter_visual(true); rest.to_string() }));

    g.bind_action(Normal, "d", start_op(OperatorId::Delete));
    g.bind_action(Normal, "c", start_op(OperatorId::Change));
    g.bind_action(Normal, "y", start_op(OperatorId::Yank));
    g.bind_action(Normal, ">", start_op(OperatorId::ShiftRight));
    g.bind_action(Normal, "<", start_op(OperatorId::ShiftLeft));
    g.bind_action(Normal, "dd", doubled(OperatorId::Delete));
    g.bind_action(Normal, "cc", doubled(OperatorId::Change));
    g.bind_action(Normal, "yy", doubled(OperatorId::Yank));
    g.bind_alias(Normal, "Y", "yy");
    g.bind_alias(Normal, "S", "cc");
    g.bind_action(Normal, ">>", doubled(OperatorId::ShiftRight));
    g.bind_action(Normal, "<<", doubled(OperatorId::ShiftLeft));

    g.bind_action(Normal, "gu", act(|ed, rest| { ed.pending.arg = Some(OperatorArg::Lower); ed.start_operator(OperatorId::CaseChange); rest.to_string() }));
    g.bind_action(Normal, "gU", act(|ed, rest| { ed.pending.arg = Some(OperatorArg::Upper); ed.start_operator(OperatorId::CaseChange); rest.to_string() }));
    g.bind_action(Normal, "g~", act(|ed, rest| { ed.pending.arg = Some(OperatorArg::Swap); ed.start_operator(OperatorId::CaseChange); rest.to_string() }));
    g.bind_action(Normal, "guu", case_change_doubled(OperatorArg::Lower));
    g.bind_action(Normal, "gUU", case_change_doubled(OperatorArg::Upper));
    g.bind_action(Normal, "g~~", case_change_doubled(OperatorArg::Swap));
    g.bind_action(Normal, "~", case_change_with_motion(OperatorArg::Swap, MotionId::Right));

    g.bind_action(Normal, "x", charwise_op_with_motion(OperatorId::Delete, MotionId::Right));
    g.bind_action(Normal, "X", charwise_op_with_motion(OperatorId::Delete, MotionId::Left));
    g.bind_action(Normal, "D", charwise_op_with_motion(OperatorId::Delete, MotionId::LineEnd));
    g.bind_action(Normal, "C", charwise_op_with_motion(OperatorId::Change, MotionId::LineEnd));
    g.bind_action(Normal, "s", charwise_op_with_motion(OperatorId::Change, MotionId::Right));
    g.bind_action(
        Normal,
        "J",
        act(|ed, rest| {
            ed.start_operator(OperatorId::Join);
            ed.do_motion(MotionId::Down);
            rest.to_string()
        }),
    );

    for (key, anchor) in [
        ("p", PutAnchor::After),
        ("P", PutAnchor::Before),
        ("gp", PutAnchor::AfterLeaveEnd),
        ("gP", PutAnchor::BeforeLeaveEnd),
    ] {
        g.bind_action(
            Normal,
            key,
            act(move |ed, rest| {
                ed.start_operator(OperatorId::Put(anchor));
                ed.do_motion(MotionId::Nop);
                rest.to_string()
            }),
        );
    }

    g.bind_action(Normal, "r", act(|ed, rest| { ed.await_replace_char(); rest.to_string() }));
    g.bind_action(Normal, "u", act(|ed, rest| { ed.undo(); rest.to_string() }));
    g.bind_action(Normal, "<C-r>", act(|ed, rest| { ed.redo(); rest.to_string() }));
    g.bind_action(Normal, ".", act(|ed, rest| { ed.repeat_last(); rest.to_string() }));
    g.bind_action(Normal, "m", act(|ed, rest| { ed.await_set_mark(); rest.to_string() }));
    g.bind_action(Normal, "\"", act(|ed, rest| { ed.await_select_register(); rest.to_string() }));
    g.bind_action(
        Normal,
        "q",
        act(|ed, rest| {
            if ed.macros.is_recording() {
                let _ = ed.toggle_macro_recording('\0');
            } else {
                ed.await_macro_register();
            }
            rest.to_string()
        }),
    );
    g.bind_action(Normal, "@", act(|ed, rest| { ed.await_play_macro(); rest.to_string() }));

    g.bind_action(Normal, ":", act(|ed, rest| { ed.begin_prompt(PromptKind::Ex); rest.to_string() }));
    g.bind_action(Normal, "/", act(|ed, rest| { ed.begin_prompt(PromptKind::SearchForward); rest.to_string() }));
    g.bind_action(Normal, "?", act(|ed, rest| { ed.begin_prompt(PromptKind::SearchBackward); rest.to_string() }));

    g.bind_action(Normal, "<C-o>", act(|ed, rest| { ed.jump_back(); rest.to_string() }));
    g.bind_action(Normal, "<C-i>", act(|ed, rest| { ed.jump_forward(); rest.to_string() }));
    g.bind_action(Normal, "g;", act(|ed, rest| { ed.change_older(); rest.to_string() }));
    g.bind_action(Normal, "g,", act(|ed, rest| { ed.change_newer(); rest.to_string() }));

    g.bind_action(
        Normal,
        "<C-n>",
        act(|ed, rest| {
            let before = ed.window.view.primary().pos;
            ed.do_motion(MotionId::WordUnderCursorForward);
            let after = ed.window.view.primary().pos;
            if after != before {
                ed.window.view.add_cursor(after);
            }
            rest.to_string()
        }),
    );

    g.bind_action(
        Normal,
        "<Esc>",
        act(|ed, rest| {
            let pos = ed.window.view.primary().pos;
            ed.window.view.collapse_to(pos);
            ed.pending.reset();
            rest.to_string()
        }),
    );

    g.bind_action(Normal, "<C-w>", act(|ed, rest| { let _ = ed.window.ui.suspend(); rest.to_string() }));
}

fn bind_visual_common(g: &mut ModeGraph, mode: ModeId) {
    g.bind_action(mode, "<Esc>", act(|ed, rest| { ed.set_mode(ModeId::Normal); rest.to_string() }));
    g.bind_action(mode, "o", act(|ed, rest| { ed.swap_visual_ends(); rest.to_string() }));

    g.bind_action(mode, "d", visual_op(OperatorId::Delete, None));
    g.bind_action(mode, "x", visual_op(OperatorId::Delete, None));
    g.bind_action(mode, "y", visual_op(OperatorId::Yank, None));
    g.bind_action(mode, ">", visual_op(OperatorId::ShiftRight, None));
    g.bind_action(mode, "<", visual_op(OperatorId::ShiftLeft, None));
    g.bind_action(mode, "J", visual_op(OperatorId::Join, None));
    g.bind_action(mode, "gu", visual_op(OperatorId::CaseChange, Some(OperatorArg::Lower)));
    g.bind_action(mode, "gU", visual_op(OperatorId::CaseChange, Some(OperatorArg::Upper)));
    g.bind_action(mode, "g~", visual_op(OperatorId::CaseChange, Some(OperatorArg::Swap)));
    g.bind_action(mode, "p", visual_op(OperatorId::Put(PutAnchor::Before), None));
    g.bind_action(
        mode,
        "c",
        act(|ed, rest| {
            ed.run_visual_change(None);
            rest.to_string()
        }),
    );
    g.bind_alias(mode, "s", "c");
    g.bind_action(mode, "\"", act(|ed, rest| { ed.await_select_register(); rest.to_string() }));
}

fn bind_visual(g: &mut ModeGraph) {
    bind_visual_common(g, ModeId::Visual);
    g.bind_action(ModeId::Visual, "v", act(|ed, rest| { ed.set_mode(ModeId::Normal); rest.to_string() }));
    g.bind_action(ModeId::Visual, "V", act(|ed, rest| { ed.set_mode(ModeId::VisualLine); rest.to_string() }));
}

fn bind_visual_line(g: &mut ModeGraph) {
    bind_visual_common(g, ModeId::VisualLine);
    g.bind_action(ModeId::VisualLine, "V", act(|ed, rest| { ed.set_mode(ModeId::Normal); rest.to_string() }));
    g.bind_action(ModeId::VisualLine, "v", act(|ed, rest| { ed.set_mode(ModeId::Visual); rest.to_string() }));
}

fn bind_insert(g: &mut ModeGraph) {
    use ModeId::Insert;
    g.bind_action(Insert, "<Esc>", act(|ed, rest| {
        ed.set_mode(ModeId::Normal);
        let pos = ed.window.view.primary().pos;
        ed.window.view.primary_mut().pos = pos.saturating_sub(1);
        rest.to_string()
    }));
    g.bind_action(Insert, "<BS>", act(|ed, rest| { ed.backspace_at_cursors(); rest.to_string() }));
    g.bind_action(Insert, "<Enter>", act(|ed, rest| {
        ed.feed("\n");
        rest.to_string()
    }));
}

fn bind_replace(g: &mut ModeGraph) {
    use ModeId::Replace;
    g.bind_action(Replace, "<Esc>", act(|ed, rest| {
        ed.set_mode(ModeId::Normal);
        let pos = ed.window.view.primary().pos;
        ed.window.view.primary_mut().pos = pos.saturating_sub(1);
        rest.to_string()
    }));
    g.bind_action(Replace, "<BS>", act(|ed, rest| { ed.backspace_at_cursors(); rest.to_string() }));
}

fn bind_prompt(g: &mut ModeGraph) {
    use ModeId::Prompt;
    g.bind_action(Prompt, "<Esc>", act(|ed, rest| { ed.cancel_prompt(); rest.to_string() }));
    g.bind_action(Prompt, "<Enter>", act(|ed, rest| { ed.finish_prompt(); rest.to_string() }));
    g.bind_action(Prompt, "<BS>", act(|ed, rest| { ed.prompt_backspace(); rest.to_string() }));
}
