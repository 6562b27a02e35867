//! Deterministic choice among members competing for one desired entry.

use termstore_kernel::Member;

/// Ranks modules: first the component's resolved module, then the configured
/// secondary modules, then everything else. Ties go to the lowest member id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModulePreference {
    ranked: Vec<String>,
}

impl ModulePreference {
    pub fn new(primary: impl Into<String>, secondary: &[String]) -> Self {
        let mut ranked = vec![primary.into()];
        for module in secondary {
            if !ranked.contains(module) {
                ranked.push(module.clone());
            }
        }
        Self { ranked }
    }

    pub fn rank(&self, module_id: &str) -> usize {
        self.ranked
            .iter()
            .position(|module| module == module_id)
            .unwrap_or(self.ranked.len())
    }

    pub fn pick<'a, I>(&self, members: I) -> Option<&'a Member>
    where
        I: IntoIterator<Item = &'a Member>,
    {
        members
            .into_iter()
            .min_by(|left, right| {
                (self.rank(&left.module_id), left.id.as_str())
                    .cmp(&(self.rank(&right.module_id), right.id.as_str()))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use termstore_kernel::MemberPayload;

    fn member(id: &str, module: &str) -> Member {
        Member::with_id(id, "r", "c", module, MemberPayload::Simple)
    }

    #[test]
    fn own_module_wins_over_secondary_and_unknown() {
        let preference = ModulePreference::new("1000154104", &["900000000000207008".to_string()]);
        let members = [
            member("a", "900000000000012004"),
            member("b", "900000000000207008"),
            member("c", "1000154104"),
        ];
        assert_eq!(preference.pick(&members).map(|m| m.id.as_str()), Some("c"));
        assert_eq!(
            preference.pick(&members[..2]).map(|m| m.id.as_str()),
            Some("b")
        );
    }

    #[test]
    fn unranked_modules_fall_back_to_id_order() {
        let preference = ModulePreference::new("1000154104", &[]);
        let members = [member("z", "1"), member("m", "2"), member("q", "3")];
        assert_eq!(preference.pick(&members).map(|m| m.id.as_str()), Some("m"));
        assert_eq!(preference.pick(&Vec::<Member>::new()), None);
    }

    #[test]
    fn duplicate_secondary_modules_collapse() {
        let preference = ModulePreference::new("x", &["x".to_string(), "y".to_string()]);
        assert_eq!(preference.rank("x"), 0);
        assert_eq!(preference.rank("y"), 1);
        assert_eq!(preference.rank("z"), 2);
    }
}
