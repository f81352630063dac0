use crate::descriptor::Descriptor;
use crate::MatchParams;

/// Correspondence between a query and a train descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Match {
    pub query: usize,
    pub train: usize,
    pub distance: u32,
}

/// Nearest and second-nearest train descriptors of one query.
#[derive(Clone, Copy, Debug)]
struct Nearest {
    index: usize,
    distance: u32,
    second: Option<u32>,
}

/// Ties go to the lowest train index.
fn nearest(query: &Descriptor, train: &[Descriptor]) -> Option<Nearest> {
    let mut best: Option<Nearest> = None;
    for (index, t) in train.iter().enumerate() {
        let distance = query.hamming(t);
        best = Some(match best {
            None => Nearest {
                index,
                distance,
                second: None,
            },
            Some(b) if distance < b.distance => Nearest {
                index,
                distance,
                second: Some(b.distance),
            },
            Some(b) => Nearest {
                second: Some(b.second.map_or(distance, |s| s.min(distance))),
                ..b
            },
        });
    }
    best
}

/// Brute-force Hamming matching with ratio test, distance cap and optional
/// cross-check. Output is ordered by query index.
pub fn match_descriptors(
    query: &[Descriptor],
    train: &[Descriptor],
    params: &MatchParams,
) -> Vec<Match> {
    if query.is_empty() || train.is_empty() {
        return Vec::new();
    }

    let reverse: Vec<Option<usize>> = if params.cross_check {
        train
            .iter()
            .map(|t| nearest(t, query).map(|n| n.index))
            .collect()
    } else {
        Vec::new()
    };

    let mut out = Vec::new();
    for (qi, q) in query.iter().enumerate() {
        let Some(n) = nearest(q, train) else {
            continue;
        };
        if n.distance > params.max_distance {
            continue;
        }
        if let Some(second) = n.second {
            if n.distance as f32 >= params.ratio * second as f32 {
                continue;
            }
        }
        if params.cross_check && reverse[n.index] != Some(qi) {
            continue;
        }
        out.push(Match {
            query: qi,
            train: n.index,
            distance: n.distance,
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(bits: u64) -> Descriptor {
        Descriptor([bits, 0, 0, 0])
    }

    #[test]
    fn unique_nearest_neighbours_match() {
        let query = [d(0b0000_0000), d(0xFFFF_0000)];
        let train = [d(0xFFFF_0001), d(0b0000_0001), d(u64::MAX)];
        let m = match_descriptors(&query, &train, &MatchParams::default());
        assert_eq!(
            m,
            vec![
                Match {
                    query: 0,
                    train: 1,
                    distance: 1
                },
                Match {
                    query: 1,
                    train: 0,
                    distance: 1
                },
            ]
        );
    }

    #[test]
    fn ambiguous_matches_are_rejected() {
        let query = [d(0)];
        let train = [d(0b11), d(0b1100)];
        assert!(match_descriptors(&query, &train, &MatchParams::default()).is_empty());

        let identical = [d(7), d(7)];
        assert!(match_descriptors(&[d(7)], &identical, &MatchParams::default()).is_empty());
    }

    #[test]
    fn distance_cap_applies() {
        let params = MatchParams {
            max_distance: 3,
            ..MatchParams::default()
        };
        let m = match_descriptors(&[d(0)], &[d(0xFF)], &params);
        assert!(m.is_empty());
    }

    #[test]
    fn cross_check_requires_mutual_best() {
        // Both queries prefer train 0, which prefers query 1.
        let query = [d(0b1111), d(0b0111)];
        let train = [d(0b0011), d(u64::MAX)];
        let relaxed = MatchParams {
            cross_check: false,
            ..MatchParams::default()
        };
        assert_eq!(match_descriptors(&query, &train, &relaxed).len(), 2);
        let strict = match_descriptors(&query, &train, &MatchParams::default());
        assert_eq!(strict.len(), 1);
        assert_eq!(strict[0].query, 1);
    }
}
