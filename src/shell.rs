use std::{
	fmt::Display,
	io::{self, IsTerminal, Write},
};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Status lines for the operator, printed to stderr the way cargo prints them
pub struct Shell {
	err: StandardStream,
}

impl Shell {
	pub fn new() -> Self {
		let choice = if io::stderr().is_terminal() { ColorChoice::Auto } else { ColorChoice::Never };
		Shell { err: StandardStream::stderr(choice) }
	}

	/// A right aligned, green, bold `status` followed by the message
	pub fn status(&mut self, status: impl Display, message: impl Display) -> io::Result<()> {
		self.print(status, message, Color::Green)
	}

	/// Like `status`, but in yellow to catch the operator's eye
	pub fn note(&mut self, status: impl Display, message: impl Display) -> io::Result<()> {
		self.print(status, message, Color::Yellow)
	}

	fn print(&mut self, status: impl Display, message: impl Display, color: Color) -> io::Result<()> {
		self.err.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true))?;
		write!(self.err, "{:>12}", status)?;
		self.err.reset()?;
		writeln!(self.err, " {}", message)
	}
}

impl Default for Shell {
	fn default() -> Self {
		Self::new()
	}
}
