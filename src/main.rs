fn main() {
    notebook_catalog::run()
}
