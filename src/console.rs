//! Interactive console adapter for the classification review session.
//!
//! All correction logic lives in [`crate::pipeline::review`]; this adapter
//! only renders the session and translates typed commands.

use std::io::{BufRead, Write};

use crate::config::AppConfig;
use crate::domain::LanguageCode;
use crate::error::Result;
use crate::pipeline::review::{
    Correction, CorrectionSource, DescriptionGroup, ReviewCommand, ReviewSession,
};

pub struct ConsoleReviewer<R, W> {
    input: R,
    output: W,
    known_codes: Vec<String>,
    /// Listing shown at the last prompt, so `set <n>` numbers stay stable
    /// even after corrections reorder the live listing.
    last_listing: Vec<String>,
    printed_help: bool,
}

impl ConsoleReviewer<std::io::StdinLock<'static>, std::io::Stdout> {
    pub fn stdio(config: &AppConfig) -> Self {
        ConsoleReviewer::new(std::io::stdin().lock(), std::io::stdout(), config)
    }
}

impl<R: BufRead, W: Write> ConsoleReviewer<R, W> {
    pub fn new(input: R, output: W, config: &AppConfig) -> Self {
        Self {
            input,
            output,
            known_codes: config
                .language_codes()
                .iter()
                .map(|c| c.to_string())
                .collect(),
            last_listing: Vec::new(),
            printed_help: false,
        }
    }

    fn print_session(&mut self, session: &ReviewSession) -> std::io::Result<()> {
        writeln!(self.output, "\n{}", "-".repeat(78))?;
        writeln!(self.output, "{:^78}", "Language Detection Results")?;
        writeln!(self.output, "{}", "-".repeat(78))?;

        let mut counts: Vec<(LanguageCode, usize)> =
            session.language_counts().into_iter().collect();
        counts.sort();
        for (code, count) in counts {
            writeln!(self.output, "   {}: {} rows", code, count)?;
        }

        writeln!(
            self.output,
            "\n{} unique line descriptions:",
            session.len()
        )?;
        self.last_listing.clear();
        for (number, group) in session.groups().iter().enumerate() {
            let code = group
                .confirmed
                .clone()
                .unwrap_or_else(LanguageCode::unknown);
            writeln!(
                self.output,
                "{:3}. [{}] {} ({} occurrences)",
                number + 1,
                code,
                group.description,
                group.occurrences()
            )?;
            self.last_listing.push(group.description.clone());
        }

        if !self.printed_help {
            writeln!(self.output, "\nCommands:")?;
            writeln!(self.output, "  set <n> <code>        correct one listed description")?;
            writeln!(self.output, "  match <code> <text>   correct every description containing <text>")?;
            writeln!(self.output, "  list                  reprint the listing")?;
            writeln!(self.output, "  done                  accept and finalize")?;
            writeln!(self.output, "  abandon               quit without emitting rows")?;
            writeln!(
                self.output,
                "Known codes: {}",
                self.known_codes.join(", ")
            )?;
            self.printed_help = true;
        }
        Ok(())
    }

    fn read_line(&mut self) -> std::io::Result<Option<String>> {
        write!(self.output, "\n> ")?;
        self.output.flush()?;
        let mut line = String::new();
        let bytes = self.input.read_line(&mut line)?;
        if bytes == 0 {
            // EOF finalizes rather than looping on an exhausted stream.
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    fn validate_code(&mut self, code: &str) -> std::io::Result<Option<LanguageCode>> {
        if self.known_codes.iter().any(|known| known == code) {
            Ok(Some(LanguageCode::new(code)))
        } else {
            writeln!(
                self.output,
                "Unknown code '{}'. Known codes: {}",
                code,
                self.known_codes.join(", ")
            )?;
            Ok(None)
        }
    }

    fn parse_command(&mut self, line: &str) -> std::io::Result<Option<ReviewCommand>> {
        let mut parts = line.splitn(3, char::is_whitespace);
        let verb = parts.next().unwrap_or("");
        match verb {
            "" | "list" => Ok(None),
            "done" | "ok" => Ok(Some(ReviewCommand::Finalize)),
            "abandon" | "quit" | "q" => Ok(Some(ReviewCommand::Abandon)),
            "set" => {
                let number = parts.next().unwrap_or("").parse::<usize>().ok();
                let code = parts.next().unwrap_or("").trim();
                match (number, code.is_empty()) {
                    (Some(n), false) if n >= 1 && n <= self.last_listing.len() => {
                        match self.validate_code(code)? {
                            Some(code) => Ok(Some(ReviewCommand::Correct(Correction::Exact {
                                description: self.last_listing[n - 1].clone(),
                                code,
                            }))),
                            None => Ok(None),
                        }
                    }
                    _ => {
                        writeln!(self.output, "Usage: set <n> <code>")?;
                        Ok(None)
                    }
                }
            }
            "match" => {
                let code = parts.next().unwrap_or("");
                let pattern = parts.next().unwrap_or("").trim();
                if code.is_empty() || pattern.is_empty() {
                    writeln!(self.output, "Usage: match <code> <text>")?;
                    return Ok(None);
                }
                match self.validate_code(code)? {
                    Some(code) => Ok(Some(ReviewCommand::Correct(Correction::Pattern {
                        pattern: pattern.to_string(),
                        code,
                    }))),
                    None => Ok(None),
                }
            }
            _ => {
                writeln!(self.output, "Unrecognized command '{}'", verb)?;
                Ok(None)
            }
        }
    }
}

impl<R: BufRead, W: Write> CorrectionSource for ConsoleReviewer<R, W> {
    fn next_command(&mut self, session: &ReviewSession) -> Result<ReviewCommand> {
        self.print_session(session)?;
        loop {
            let Some(line) = self.read_line()? else {
                return Ok(ReviewCommand::Finalize);
            };
            if let Some(command) = self.parse_command(&line)? {
                return Ok(command);
            }
            if line == "list" {
                self.print_session(session)?;
            }
        }
    }
}

/// Render the listing without any interaction, for the `inspect` command.
pub fn print_groups(session: &ReviewSession, groups: &[&DescriptionGroup]) {
    println!("{} unique line descriptions", session.len());
    for (number, group) in groups.iter().enumerate() {
        let code = group
            .confirmed
            .clone()
            .unwrap_or_else(LanguageCode::unknown);
        println!(
            "{:3}. [{}] {} ({} occurrences)",
            number + 1,
            code,
            group.description,
            group.occurrences()
        );
    }
}
