use std::fmt::Display;

/// A single command: the program, its arguments and where it should run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub(crate) words: Vec<String>,
    pub(crate) background: bool,
}

impl Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.words.join(" "))?;
        if self.background {
            f.write_str(" &")?;
        }
        Ok(())
    }
}

impl Command {
    /// Split a single segment of a command line into words. A trailing `&`, either as a word of
    /// its own or glued to the last word, requests background execution.
    pub fn parse(segment: &str) -> Option<Self> {
        let mut words: Vec<String> = segment.split_whitespace().map(str::to_string).collect();
        let mut background = false;

        if let Some(last) = words.last_mut() {
            if let Some(stripped) = last.strip_suffix('&') {
                background = true;
                if stripped.is_empty() {
                    words.pop();
                } else {
                    *last = stripped.to_string();
                }
            }
        }

        if words.is_empty() {
            None
        } else {
            Some(Self { words, background })
        }
    }

    /// The program to run, also used as the job name.
    pub fn program(&self) -> &str {
        &self.words[0]
    }

    pub fn arguments(&self) -> &[String] {
        &self.words[1..]
    }

    pub fn is_background(&self) -> bool {
        self.background
    }
}

/// A line typed by the user: `;`-separated commands executed left to right.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine(Vec<Command>);

impl CommandLine {
    pub fn parse(line: &str) -> Self {
        Self(line.split(';').filter_map(Command::parse).collect())
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl IntoIterator for CommandLine {
    type Item = Command;
    type IntoIter = std::vec::IntoIter<Command>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
