fn main() {
    winsor_tool::cli::run();
}
