//! 多尺度搜索消融实验.
//!
//! 在合成参数图上比较单尺度, 多尺度, 以及带前列腺掩膜的多尺度搜索.

mod profile;
mod result;
mod runner;

fn main() {
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .init()
        .unwrap();

    runner::run().analyze();
}
