mod document;
mod event;
mod registry;

#[ctor::ctor]
fn init() {
    colog::init();
}
