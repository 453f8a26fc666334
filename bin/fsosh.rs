fn main() {
    fso_shell::shell_main()
}
