//! Regional uplink channel plans.
//!
//! Frequencies are carried as decimal-Hz strings end to end, matching the
//! wire format, so plan lookup is string comparison.

/// Spreading factors KPI distributions are bucketed over.
pub const UPLINK_SPREADING_FACTORS: [u32; 6] = [7, 8, 9, 10, 11, 12];

pub const EU868: &[&str] = &[
    "868100000",
    "868300000",
    "868500000",
    "867100000",
    "867300000",
    "867500000",
    "867700000",
    "867900000",
];

pub const US915: &[&str] = &[
    "902300000",
    "902500000",
    "902700000",
    "902900000",
    "903100000",
    "903300000",
    "903500000",
    "903700000",
    "903900000",
    "904100000",
    "904300000",
    "904500000",
    "904700000",
    "904900000",
    "905100000",
    "905300000",
];

pub const AU915: &[&str] = &[
    "915200000",
    "915400000",
    "915600000",
    "915800000",
    "916000000",
    "916200000",
    "916400000",
    "916600000",
    "916800000",
    "917000000",
    "917200000",
    "917400000",
    "917600000",
    "917800000",
    "918000000",
    "918200000",
];

/// Returns the channel plan containing `frequency`, or `None` when the
/// frequency belongs to no supported region.
pub fn region_plan_for(frequency: &str) -> Option<&'static [&'static str]> {
    [EU868, US915, AU915]
        .into_iter()
        .find(|plan| plan.contains(&frequency))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_the_matching_region() {
        assert_eq!(region_plan_for("868100000"), Some(EU868));
        assert_eq!(region_plan_for("903900000"), Some(US915));
        assert_eq!(region_plan_for("916000000"), Some(AU915));
    }

    #[test]
    fn unknown_frequency_has_no_plan() {
        assert_eq!(region_plan_for("433100000"), None);
    }
}
