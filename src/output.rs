//! Terminal messages for the person running the tool.
//! `info`/`ok` lines and reports go to stdout, `warn`/`error` lines to stderr.
//! Tags are colored only when the stream is a terminal.

use owo_colors::{OwoColorize, Style};

#[derive(Clone, Copy)]
enum Stream {
    Out,
    Err,
}

impl Stream {
    fn is_terminal(self) -> bool {
        match self {
            Stream::Out => atty::is(atty::Stream::Stdout),
            Stream::Err => atty::is(atty::Stream::Stderr),
        }
    }
}

fn emit(stream: Stream, tag: &str, style: Style, msg: &str) {
    let line = if stream.is_terminal() {
        format!("{} {msg}", tag.style(style))
    } else {
        format!("{tag} {msg}")
    };
    match stream {
        Stream::Out => println!("{line}"),
        Stream::Err => eprintln!("{line}"),
    }
}

pub fn print_info(msg: &str) {
    emit(Stream::Out, "info:", Style::new().cyan().bold(), msg);
}

pub fn print_success(msg: &str) {
    emit(Stream::Out, "ok:", Style::new().green().bold(), msg);
}

pub fn print_warn(msg: &str) {
    emit(Stream::Err, "warn:", Style::new().yellow().bold(), msg);
}

pub fn print_error(msg: &str) {
    emit(Stream::Err, "error:", Style::new().red().bold(), msg);
}

/// Unprefixed stdout line for summaries and JSON that scripts may parse.
pub fn print_user(msg: &str) {
    println!("{msg}");
}
