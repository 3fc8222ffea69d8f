fn main() -> std::process::ExitCode {
    auto_reader_lib::run()
}
