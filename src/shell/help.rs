pub const USAGE_MSG: &str = "Usage: fsosh [-q] [-c <command line>]";

const DESCRIPTOR: &str = "Small interactive shell with job control.
Without -c, commands are read from standard input until 'logout' or end of input.";

const HELP_MSG: &str = "Options:
-c, --command <line>            run one command line and exit with its status
-q, --quiet                     do not print the built-in help at startup

-h, --help                      display this help
-V, --version                   display version
";

/// The banner printed at startup and by `help`.
pub const BUILTINS_MSG: &str = "   ---------------------
   Shell basico FSO 2007
   ---------------------
   help                   esta ayuda
   logout                 salir
   cd [directorio]        cambia de directorio
   jobs                   lista los trabajos
   fg <n>                 trae el trabajo n a primer plano
   bg <n>                 reanuda el trabajo n en segundo plano
   programa <args> [&]    ejecuta el programa
";

pub fn long_help_message() -> String {
    format!("{USAGE_MSG}\n\n{DESCRIPTOR}\n\n{HELP_MSG}")
}
