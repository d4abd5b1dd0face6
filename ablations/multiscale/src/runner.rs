//! 程序运行函数.

use std::thread;

use roi_berry::prelude::*;
use utils::phantom::{self, Phantom};

use crate::profile::Profile;
use crate::result::AblationResult;

const DEFAULT_PHANTOMS: usize = 8;

/// 参与比较的搜索方式.
#[derive(Copy, Clone, Debug)]
struct Setup {
    name: &'static str,
    config: fn() -> SearchConfig,
    masked: bool,
}

fn roi_shape() -> WindowShape {
    WindowShape::new(1, 5, 5).unwrap()
}

fn single_scale() -> SearchConfig {
    SearchConfig::new(2..=2, 5..=5, 200, roi_shape()).unwrap()
}

fn multi_scale() -> SearchConfig {
    SearchConfig::new(1..=3, 5..=9, 200, roi_shape()).unwrap()
}

const SETUPS: [Setup; 3] = [
    Setup {
        name: "single",
        config: single_scale,
        masked: false,
    },
    Setup {
        name: "multi",
        config: multi_scale,
        masked: false,
    },
    Setup {
        name: "masked",
        config: multi_scale,
        masked: true,
    },
];

/// 在全部参数图上运行一种搜索方式.
fn run_setup(setup: Setup, phantoms: &[Phantom]) -> Profile {
    let config = (setup.config)();
    let mut profile = Profile::new();
    for (i, p) in phantoms.iter().enumerate() {
        log::info!("{}: phantom {i}...", setup.name);
        let mask = setup.masked.then(|| p.prostate());

        profile.start();
        let found = find_roi(p.volume(), &config, mask);
        profile.elapsed();

        match found {
            Ok(r) if p.hits(&r.subregion()) => profile.count_hit(),
            Ok(r) => {
                log::debug!("{}: missed at {:?}, lesion {:?}", setup.name, r.corner(), p.lesion());
                profile.count_miss();
            }
            Err(e) => {
                log::warn!("{}: {e}", setup.name);
                profile.count_failure();
            }
        }
    }
    profile.finish()
}

/// 实际运行.
pub fn run() -> AblationResult {
    let n = utils::phantom_count_from_env_or(DEFAULT_PHANTOMS);
    let phantoms: Vec<_> = phantom::phantoms(n).collect();
    log::info!(
        "Running ablation studies on {n} phantoms with {} cpus...",
        utils::cpus()
    );

    thread::scope(|s| {
        let p = phantoms.as_slice();
        let handles = SETUPS.map(|setup| s.spawn(move || run_setup(setup, p)));

        AblationResult::from_iter(
            SETUPS.iter().map(|setup| setup.name).zip(
                handles
                    .into_iter()
                    .map(|th| th.join().expect("Thread joining error")),
            ),
        )
    })
}
