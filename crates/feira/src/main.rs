mod app;

fn main() {
    app::start_feira();
}
