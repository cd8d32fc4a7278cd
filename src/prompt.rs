//! Interactive parameter entry.
//!
//! Every question runs the same loop: take the pre-supplied value if there is
//! one, otherwise read a line; parse and check it; on failure print the reason
//! and ask again. Malformed answers are never fatal. Only a closed input
//! (Ctrl-D) ends the loop early, surfacing as [`PromptError::Interrupted`].

use std::fmt::Display;
use std::io::{self, BufRead, StdinLock, Stdout, Write};
use std::ops::RangeInclusive;
use std::str::FromStr;

use crate::error::PromptError;
use crate::source::Dimensions;

pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl Prompter<StdinLock<'static>, Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Reads one trimmed line after showing `prompt`.
    pub fn line(&mut self, prompt: &str) -> Result<String, PromptError> {
        write!(self.output, "{prompt}: ")?;
        self.output.flush()?;
        let mut buf = String::new();
        if self.input.read_line(&mut buf)? == 0 {
            writeln!(self.output)?;
            return Err(PromptError::Interrupted);
        }
        Ok(buf.trim().to_string())
    }

    /// Shows a diagnostic between questions.
    pub fn report(&mut self, message: impl Display) -> Result<(), PromptError> {
        writeln!(self.output, "\n{message}\n")?;
        Ok(())
    }

    /// Validate-or-retry loop. `preset` is checked first and discarded if it
    /// fails; after that every answer comes from the reader.
    pub fn ask<T, P>(
        &mut self,
        prompt: &str,
        preset: Option<T>,
        mut parse: P,
    ) -> Result<T, PromptError>
    where
        P: FnMut(Option<T>, &str) -> Result<T, String>,
    {
        let mut pending = preset;
        loop {
            let attempt = match pending.take() {
                Some(value) => parse(Some(value), ""),
                None => {
                    let answer = self.line(prompt)?;
                    parse(None, &answer)
                }
            };
            match attempt {
                Ok(value) => return Ok(value),
                Err(reason) => self.report(reason)?,
            }
        }
    }

    pub fn text(&mut self, prompt: &str, preset: Option<String>) -> Result<String, PromptError> {
        self.ask(prompt, preset, |preset, answer| {
            let value = preset.unwrap_or_else(|| answer.to_string());
            if value.trim().is_empty() {
                Err("A value is required".to_string())
            } else {
                Ok(value)
            }
        })
    }

    /// Like [`Prompter::text`] but an empty answer picks `default`.
    pub fn text_or_default(&mut self, prompt: &str, default: &str) -> Result<String, PromptError> {
        let answer = self.line(prompt)?;
        Ok(if answer.is_empty() {
            default.to_string()
        } else {
            answer
        })
    }

    pub fn dimensions(
        &mut self,
        prompt: &str,
        preset: Option<Dimensions>,
        default: Option<Dimensions>,
    ) -> Result<Dimensions, PromptError> {
        let prompt = match default {
            Some(default) => format!("{prompt} (widthxheight, default: {default})"),
            None => format!("{prompt} (widthxheight)"),
        };
        self.ask(&prompt, preset, |preset, answer| {
            if let Some(dims) = preset {
                return Ok(dims);
            }
            match (answer.is_empty(), default) {
                (true, Some(default)) => Ok(default),
                _ => answer.parse::<Dimensions>().map_err(|err| err.to_string()),
            }
        })
    }

    pub fn bounded<T>(
        &mut self,
        prompt: &str,
        preset: Option<T>,
        default: T,
        range: RangeInclusive<T>,
    ) -> Result<T, PromptError>
    where
        T: FromStr + PartialOrd + Display + Copy,
    {
        let prompt = format!("{prompt} (default: {default})");
        self.ask(&prompt, preset, |preset, answer| {
            let value = match preset {
                Some(value) => value,
                None if answer.is_empty() => default,
                None => answer
                    .parse::<T>()
                    .map_err(|_| "Invalid input".to_string())?,
            };
            if range.contains(&value) {
                Ok(value)
            } else {
                Err(format!(
                    "Value must be >= {} and <= {}",
                    range.start(),
                    range.end()
                ))
            }
        })
    }

    pub fn confirm(&mut self, prompt: &str) -> Result<bool, PromptError> {
        let prompt = format!("{prompt} (Y/n)");
        self.ask(&prompt, None, |_, answer| {
            match answer.to_lowercase().as_str() {
                "y" | "yes" => Ok(true),
                "n" | "no" => Ok(false),
                _ => Err("Invalid input".to_string()),
            }
        })
    }
}
