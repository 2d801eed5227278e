use std::io::{BufRead, Write};
use std::str::FromStr;

use crossterm::style::{Color, Stylize};

use super::ShellError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Banner,
    Info,
    Status,
    Menu,
    Prompt,
    Ok,
    Error,
}

impl Tone {
    fn color(self) -> Color {
        match self {
            Tone::Banner => Color::Green,
            Tone::Info => Color::Cyan,
            Tone::Status | Tone::Prompt => Color::DarkYellow,
            Tone::Menu => Color::DarkBlue,
            Tone::Ok => Color::DarkGreen,
            Tone::Error => Color::DarkRed,
        }
    }
}

pub fn paint(text: &str, tone: Tone) -> String {
    text.with(tone.color()).to_string()
}

/// Line-oriented terminal I/O. Generic so the shell runs against
/// in-memory buffers in tests.
pub struct Console<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    pub fn output(&mut self) -> &mut W {
        &mut self.output
    }

    pub fn say(&mut self, text: &str, tone: Tone) -> Result<(), ShellError> {
        writeln!(self.output, "{}", paint(text, tone))?;
        Ok(())
    }

    pub fn blank(&mut self) -> Result<(), ShellError> {
        writeln!(self.output)?;
        Ok(())
    }

    /// Print `prompt` and read one line. End of input is reported as
    /// [`ShellError::InputClosed`]; bytes that are not UTF-8 are replaced
    /// so the answer is rejected by whoever parses it.
    pub fn ask(&mut self, prompt: &str) -> Result<String, ShellError> {
        write!(self.output, "{}", paint(prompt, Tone::Prompt))?;
        self.output.flush()?;
        let mut line = Vec::new();
        if self.input.read_until(b'\n', &mut line)? == 0 {
            return Err(ShellError::InputClosed);
        }
        Ok(String::from_utf8_lossy(&line).trim().to_owned())
    }

    pub fn ask_or(&mut self, prompt: &str, default: &str) -> Result<String, ShellError> {
        let answer = self.ask(prompt)?;
        Ok(if answer.is_empty() {
            default.to_owned()
        } else {
            answer
        })
    }

    /// Re-prompt until the answer parses; a blank answer takes `default`
    /// when one is given.
    pub fn ask_number<T>(&mut self, prompt: &str, default: Option<T>) -> Result<T, ShellError>
    where
        T: FromStr + Copy,
    {
        loop {
            let answer = self.ask(prompt)?;
            if answer.is_empty() {
                if let Some(value) = default {
                    return Ok(value);
                }
            }
            match answer.parse() {
                Ok(value) => return Ok(value),
                Err(_) => self.say(
                    &format!(" Invalid value {answer:?} (must be an integer). Please try again."),
                    Tone::Error,
                )?,
            }
        }
    }

    /// Like [`Console::ask_number`] but a blank answer leaves the field unset.
    pub fn ask_optional_number<T>(&mut self, prompt: &str) -> Result<Option<T>, ShellError>
    where
        T: FromStr,
    {
        loop {
            let answer = self.ask(prompt)?;
            if answer.is_empty() {
                return Ok(None);
            }
            match answer.parse() {
                Ok(value) => return Ok(Some(value)),
                Err(_) => self.say(
                    &format!(" Invalid value {answer:?} (must be an integer). Please try again."),
                    Tone::Error,
                )?,
            }
        }
    }

    pub fn ask_bool(&mut self, prompt: &str, default: bool) -> Result<bool, ShellError> {
        loop {
            let answer = self.ask(prompt)?.to_ascii_lowercase();
            match answer.as_str() {
                "" => return Ok(default),
                "y" | "yes" | "true" | "1" => return Ok(true),
                "n" | "no" | "false" | "0" => return Ok(false),
                _ => self.say(" Please answer y or n.", Tone::Error)?,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn console(input: &str) -> Console<Cursor<Vec<u8>>, Vec<u8>> {
        Console::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn numbers_reprompt_until_valid() {
        let mut console = console("ten\n\n10\n");
        let value: u64 = console.ask_number(" amount: ", None).unwrap();
        assert_eq!(value, 10);
        let out = String::from_utf8(console.into_output()).unwrap();
        assert_eq!(out.matches("must be an integer").count(), 2);
    }

    #[test]
    fn blank_number_takes_default() {
        let mut console = console("\n");
        let value: u16 = console.ask_number(" port: ", Some(9735)).unwrap();
        assert_eq!(value, 9735);
    }

    #[test]
    fn optional_number_blank_is_none() {
        let mut console = console("\nabc\n42\n");
        assert_eq!(console.ask_optional_number::<u32>(" fee: ").unwrap(), None);
        assert_eq!(console.ask_optional_number::<u32>(" fee: ").unwrap(), Some(42));
    }

    #[test]
    fn end_of_input_is_reported() {
        let mut console = console("");
        assert!(matches!(console.ask(" > "), Err(ShellError::InputClosed)));
    }

    #[test]
    fn undecodable_line_is_an_answer() {
        let mut console = Console::new(Cursor::new(b"\xff\xfe\n7\n".to_vec()), Vec::new());
        assert_eq!(console.ask(" > ").unwrap(), "\u{fffd}\u{fffd}");
        assert_eq!(console.ask(" > ").unwrap(), "7");
    }

    #[test]
    fn bool_answers() {
        let mut console = console("maybe\nn\n\n");
        assert!(!console.ask_bool(" ok? ", true).unwrap());
        assert!(console.ask_bool(" ok? ", true).unwrap());
    }
}
