use std::mem;

#[cfg_attr(test, derive(Debug, PartialEq))]
pub enum ShellAction {
    Help,
    Version,
    Run(ShellRunOptions),
}

impl ShellAction {
    pub fn from_env() -> Result<Self, String> {
        ShellOptions::parse_arguments(std::env::args())?.validate()
    }
}

#[derive(Debug, Default)]
#[cfg_attr(test, derive(PartialEq))]
pub struct ShellRunOptions {
    // -c
    pub command: Option<String>,
    // -q
    pub quiet: bool,
}

impl TryFrom<ShellOptions> for ShellRunOptions {
    type Error = String;

    fn try_from(mut opts: ShellOptions) -> Result<Self, Self::Error> {
        let command = mem::take(&mut opts.command);
        let quiet = mem::take(&mut opts.quiet);

        reject_all("run mode", opts)?;

        Ok(Self { command, quiet })
    }
}

fn reject_all(context: &str, opts: ShellOptions) -> Result<(), String> {
    macro_rules! ensure_options_absent {
        ($($opt:ident,)* ; $positional:ident) => {
            let ShellOptions {
                $($opt,)*
                $positional,
            } = opts;

            $(if !$opt.is_absent() {
                let name = concat!("--", stringify!($opt)).replace('_', "-");
                return Err(format!("{context} conflicts with {name}"));
            })*
        };
    }

    ensure_options_absent! {
        command,
        help,
        quiet,
        version,
        ; positional_args
    };

    if !positional_args.is_absent() {
        return Err(format!("{context} conflicts with positional argument"));
    }

    Ok(())
}

trait IsAbsent {
    fn is_absent(&self) -> bool;
}

impl IsAbsent for bool {
    fn is_absent(&self) -> bool {
        !*self
    }
}

impl<T> IsAbsent for Option<T> {
    fn is_absent(&self) -> bool {
        self.is_none()
    }
}

impl<T> IsAbsent for Vec<T> {
    fn is_absent(&self) -> bool {
        self.is_empty()
    }
}

#[derive(Debug, Default, PartialEq)]
pub(super) struct ShellOptions {
    // -c
    command: Option<String>,
    // -h
    help: bool,
    // -q
    quiet: bool,
    // -V
    version: bool,

    positional_args: Vec<String>,
}

type OptionSetter = fn(&mut ShellOptions, Option<String>) -> Result<(), String>;

struct ShellOption {
    short: char,
    long: &'static str,
    takes_argument: bool,
    set: OptionSetter,
}

impl ShellOptions {
    const SHELL_OPTIONS: &'static [ShellOption] = &[
        ShellOption {
            short: 'c',
            long: "command",
            takes_argument: true,
            set: |options, argument| {
                if options.command.is_some() {
                    Err(more_than_once("--command"))
                } else if argument.is_some() {
                    options.command = argument;
                    Ok(())
                } else {
                    Err("no command provided".into())
                }
            },
        },
        ShellOption {
            short: 'q',
            long: "quiet",
            takes_argument: false,
            set: |options, _| {
                if options.quiet {
                    Err(more_than_once("--quiet"))
                } else {
                    options.quiet = true;
                    Ok(())
                }
            },
        },
        ShellOption {
            short: 'V',
            long: "version",
            takes_argument: false,
            set: |options, _| {
                if options.version {
                    Err(more_than_once("--version"))
                } else {
                    options.version = true;
                    Ok(())
                }
            },
        },
        ShellOption {
            short: 'h',
            long: "help",
            takes_argument: false,
            set: |options, _| {
                if options.help {
                    Err(more_than_once("--help"))
                } else {
                    options.help = true;
                    Ok(())
                }
            },
        },
    ];

    /// parse the shell arguments into a ShellOptions struct
    pub(super) fn parse_arguments(
        arguments: impl IntoIterator<Item = String>,
    ) -> Result<ShellOptions, String> {
        let mut options: ShellOptions = ShellOptions::default();
        let mut arg_iter = arguments.into_iter().skip(1);

        while let Some(arg) = arg_iter.next() {
            if arg == "--" {
                options.positional_args.extend(arg_iter);

                break;
            } else if let Some(unprefixed) = arg.strip_prefix("--") {
                // parse assignments like '--command=jobs'
                if let Some((key, value)) = unprefixed.split_once('=') {
                    if let Some(option) = Self::SHELL_OPTIONS.iter().find(|o| o.long == key) {
                        if option.takes_argument {
                            (option.set)(&mut options, Some(value.to_string()))?;
                        } else {
                            Err(format!("'--{}' does not take any arguments", option.long))?;
                        }
                    } else {
                        Err(format!("unrecognized option '{arg}'"))?;
                    }
                } else if let Some(option) =
                    Self::SHELL_OPTIONS.iter().find(|o| o.long == unprefixed)
                {
                    let argument = if option.takes_argument {
                        arg_iter.next()
                    } else {
                        None
                    };
                    (option.set)(&mut options, argument)?;
                } else {
                    Err(format!("unrecognized option '{arg}'"))?;
                }
            } else if let Some(unprefixed) = arg.strip_prefix('-') {
                // flags can be grouped, so we loop over the the characters
                let mut chars = unprefixed.chars();
                while let Some(curr) = chars.next() {
                    if let Some(option) = Self::SHELL_OPTIONS.iter().find(|o| o.short == curr) {
                        let rest = chars.as_str();

                        if option.takes_argument {
                            let next_arg = if rest.is_empty() {
                                arg_iter.next()
                            } else {
                                Some(rest.to_string())
                            };
                            (option.set)(&mut options, next_arg)?;
                            break;
                        } else {
                            (option.set)(&mut options, None)?;
                        }
                    } else {
                        Err(format!("unrecognized option '{curr}'"))?;
                    }
                }
            } else {
                options.positional_args.push(arg);
            }
        }

        Ok(options)
    }

    pub(super) fn validate(mut self) -> Result<ShellAction, String> {
        let action = if self.help {
            self.help = false;
            reject_all("--help", self)?;
            ShellAction::Help
        } else if self.version {
            self.version = false;
            reject_all("--version", self)?;
            ShellAction::Version
        } else {
            ShellAction::Run(self.try_into()?)
        };
        Ok(action)
    }
}

fn more_than_once(flag: &str) -> String {
    format!("argument '{flag}' was provided more than once, but cannot be used multiple times")
}
