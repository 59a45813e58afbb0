//! Operator interaction
//!
//! Two questions are asked during a run: confirmation that redo files are
//! staged, and which loop mode to use for the batch. Progress lines go to the
//! operator as well, independent of the log filter.

use std::cell::RefCell;
use std::io::{self, BufRead, StdinLock, Stdout, Write};

use loopadrine_common::{Error, Result, WorkspaceConfig};

use crate::collaborators::LoopMode;

/// Answers the pipeline's questions
pub trait Operator {
    /// Block until the operator confirms the redo directory is staged
    fn confirm_redo(&self, config: &WorkspaceConfig) -> Result<()>;

    /// Loop mode for the whole batch
    fn choose_loop_mode(&self) -> Result<LoopMode>;

    /// Show one progress line
    fn announce(&self, line: &str) -> Result<()>;
}

/// Line-based prompt over any reader and writer
pub struct ConsolePrompt<R, W> {
    input: RefCell<R>,
    output: RefCell<W>,
}

impl ConsolePrompt<StdinLock<'static>, Stdout> {
    /// Prompt on the terminal
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> ConsolePrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input: RefCell::new(input),
            output: RefCell::new(output),
        }
    }

    /// Print `question` and read one line; closed input is an error
    fn ask(&self, question: &str) -> Result<String> {
        {
            let mut output = self.output.borrow_mut();
            write!(output, "{}", question)?;
            output.flush()?;
        }

        let mut line = String::new();
        if self.input.borrow_mut().read_line(&mut line)? == 0 {
            return Err(Error::InvalidInput("input closed before an answer was given".to_string()));
        }
        Ok(line.trim().to_string())
    }

    /// Consume the writer (lets tests inspect what was printed)
    pub fn into_output(self) -> W {
        self.output.into_inner()
    }
}

impl<R: BufRead, W: Write> Operator for ConsolePrompt<R, W> {
    fn confirm_redo(&self, config: &WorkspaceConfig) -> Result<()> {
        let raw_format = config.raw_ext.trim_start_matches('.');
        let out_format = config.output_ext.trim_start_matches('.');
        self.ask(&format!(
            "Make sure the {}(s) you'd like to re-loop are in the {} folder and the \
             corresponding {} file is in the {} folder. Press enter to continue. ",
            out_format,
            config.redo_dir.display(),
            raw_format,
            config.processed_dir.display(),
        ))?;
        Ok(())
    }

    fn choose_loop_mode(&self) -> Result<LoopMode> {
        loop {
            let answer =
                self.ask("Would you like to use interactive loop generation or automatic? (inter/auto) ")?;
            match answer.as_str() {
                "inter" => return Ok(LoopMode::Interactive),
                "auto" => return Ok(LoopMode::Automatic),
                _ => continue,
            }
        }
    }

    fn announce(&self, line: &str) -> Result<()> {
        let mut output = self.output.borrow_mut();
        writeln!(output, "{}", line)?;
        output.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_loop_mode_reprompts_until_valid() {
        let prompt = ConsolePrompt::new(Cursor::new("maybe\n\n auto \n"), Vec::new());

        assert_eq!(prompt.choose_loop_mode().unwrap(), LoopMode::Automatic);

        let printed = String::from_utf8(prompt.into_output()).unwrap();
        assert_eq!(printed.matches("(inter/auto)").count(), 3);
    }

    #[test]
    fn test_loop_mode_interactive() {
        let prompt = ConsolePrompt::new(Cursor::new("inter\n"), Vec::new());
        assert_eq!(prompt.choose_loop_mode().unwrap(), LoopMode::Interactive);
    }

    #[test]
    fn test_loop_mode_closed_input_is_error() {
        let prompt = ConsolePrompt::new(Cursor::new("nope\n"), Vec::new());
        assert!(matches!(prompt.choose_loop_mode(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_announce_writes_whole_line() {
        let prompt = ConsolePrompt::new(Cursor::new(""), Vec::new());
        prompt.announce("Generated loop point pair for Song.").unwrap();
        prompt.announce("There are no files to process!").unwrap();

        let printed = String::from_utf8(prompt.into_output()).unwrap();
        assert_eq!(
            printed,
            "Generated loop point pair for Song.\nThere are no files to process!\n"
        );
    }

    #[test]
    fn test_confirm_redo_names_folders() {
        let prompt = ConsolePrompt::new(Cursor::new("\n"), Vec::new());
        prompt.confirm_redo(&WorkspaceConfig::default()).unwrap();

        let printed = String::from_utf8(prompt.into_output()).unwrap();
        assert!(printed.contains("brstm(s)"));
        assert!(printed.contains("~redo"));
        assert!(printed.contains("corresponding wav file"));
    }
}
