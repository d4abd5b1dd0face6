//! 实验结果.

use std::io::{self, Write};

use crate::profile::Profile;

/// 将 `profile` 的结果写进 `w` 中.
fn describe_into<W: Write>(name: &str, p: &Profile, w: &mut W) -> io::Result<()> {
    const S4: &str = "    ";

    #[inline]
    fn f64_to_display(f: Option<f64>) -> String {
        match f {
            Some(f) => format!("{f:.6}"),
            None => "/".to_string(),
        }
    }

    writeln!(w, "Profile `{name}`:")?;
    writeln!(w, "{S4}Hits: {}", p.get_hits())?;
    writeln!(w, "{S4}Misses: {}", p.get_misses())?;
    writeln!(w, "{S4}Failures: {}", p.get_failures())?;
    writeln!(w, "{S4}Hit rate: {}", f64_to_display(p.get_hit_rate()))?;
    writeln!(w, "{S4}Search total time: {} us", p.get_search_time_us())?;
    writeln!(
        w,
        "{S4}Search average time: {} us",
        f64_to_display(p.get_avg_search_time_us())
    )?;
    writeln!(w, "{S4}Total machine time: {} us", p.get_real_time_us())?;
    let t = p.get_slowest().map(|d| d.as_micros().to_string());
    write!(w, "{S4}Slowest search costs {} us", t.as_deref().unwrap_or("/"))?;
    Ok(())
}

/// 消融实验最终结果.
pub struct AblationResult {
    data: Vec<(&'static str, Profile)>,
}

impl AblationResult {
    pub fn from_iter<I: IntoIterator<Item = (&'static str, Profile)>>(it: I) -> Self {
        Self {
            data: it.into_iter().collect(),
        }
    }

    /// 分析运行结果.
    pub fn analyze(&self) {
        let mut buf = Vec::with_capacity(512);
        utils::sep_to(&mut buf).unwrap();

        for (key, profile) in self.data.iter() {
            describe_into(key, profile, &mut buf).unwrap();
            writeln!(&mut buf).unwrap();
            utils::sep_to(&mut buf).unwrap();
        }
        print!("{}", String::from_utf8_lossy(&buf));
    }
}
