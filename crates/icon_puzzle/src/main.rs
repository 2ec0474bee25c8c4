fn main() {
    icon_puzzle::run();
}
