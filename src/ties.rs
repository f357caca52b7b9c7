// Tie detection, positions and averaged points

// SPDX-FileCopyrightText: 2026 Jeroen Hoekx
// SPDX-License-Identifier: AGPL-3.0-or-later

use itertools::Itertools;

use crate::points::Payout;

/// Entries sharing one score, and the position they all finish in.
#[derive(Clone, Debug, PartialEq)]
pub struct TieGroup<T> {
    pub position: u32,
    pub score: f64,
    pub members: Vec<T>,
}

impl<T> TieGroup<T> {
    pub fn size(&self) -> u32 {
        self.members.len() as u32
    }

    pub fn is_tied(&self) -> bool {
        self.members.len() > 1
    }

    /// Positions occupied by the group, e.g. `1..=3` for a three-way tie for first.
    pub fn span(&self) -> std::ops::RangeInclusive<u32> {
        self.position..=self.position + self.size().saturating_sub(1)
    }
}

/// Sort ascending by score (lowest score is best) and split into runs of equal scores.
///
/// The sort is stable: entries with equal scores keep their input order.
pub fn group_ties<T>(
    entries: impl IntoIterator<Item = T>,
    score: impl Fn(&T) -> f64,
) -> Vec<(f64, Vec<T>)> {
    let mut entries: Vec<(f64, T)> = entries.into_iter().map(|e| (score(&e), e)).collect();
    entries.sort_by(|(a, _), (b, _)| a.total_cmp(b));

    let mut groups = Vec::new();
    for (score, group) in &entries.into_iter().chunk_by(|(score, _)| *score) {
        groups.push((score, group.map(|(_, entry)| entry).collect()));
    }
    groups
}

/// Give every group the next free position, skipping the positions taken by ties.
///
/// Three players tied for first all finish 1st; the next score finishes 4th.
pub fn assign_positions<T>(groups: Vec<(f64, Vec<T>)>) -> Vec<TieGroup<T>> {
    let mut next_position = 1;
    groups
        .into_iter()
        .map(|(score, members)| {
            let group = TieGroup {
                position: next_position,
                score,
                members,
            };
            next_position += group.size();
            group
        })
        .collect()
}

/// Points for each member of a group of `size` players finishing at `position`:
/// the mean of what the occupied positions would pay, rounded to one decimal.
pub fn average_points(position: u32, size: u32, payout: &impl Payout) -> f64 {
    match size {
        0 => 0.0,
        1 => payout.points_for(position),
        _ => {
            let total: f64 = (position..position + size)
                .map(|p| payout.points_for(p))
                .sum();
            round_to_tenth(total / size as f64)
        }
    }
}

/// Round half up to one decimal place. Points are never negative.
pub fn round_to_tenth(value: f64) -> f64 {
    // the nudge absorbs representation error so that x.x5 rounds up
    (value * 10.0 + 1e-9).round() / 10.0
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{assign_positions, average_points, group_ties, round_to_tenth};
    use crate::points::{Payout, PointsTable};

    fn table() -> PointsTable {
        PointsTable::new([(1, 750.0), (2, 400.0), (3, 350.0), (4, 325.0)]).unwrap()
    }

    fn positions(scores: &[f64]) -> Vec<u32> {
        assign_positions(group_ties(scores.iter().copied(), |s| *s))
            .iter()
            .flat_map(|group| group.members.iter().map(|_| group.position))
            .collect()
    }

    #[test]
    fn empty_input() {
        let groups = group_ties(Vec::<f64>::new(), |s| *s);
        assert!(groups.is_empty());
        assert!(assign_positions(groups).is_empty());
    }

    #[rstest]
    #[case(&[70.0, 70.0, 70.0, 75.0], &[1, 1, 1, 4])]
    #[case(&[72.0, 68.0, 70.0], &[1, 2, 3])]
    #[case(&[68.0, 70.0, 70.0, 71.0], &[1, 2, 2, 4])]
    #[case(&[66.0, 66.0, 70.0, 70.0, 70.0, 81.0], &[1, 1, 3, 3, 3, 6])]
    #[case(&[80.0, 80.0], &[1, 1])]
    fn positions_skip_after_ties(#[case] scores: &[f64], #[case] expected: &[u32]) {
        assert_eq!(positions(scores), expected);
    }

    #[test]
    fn equal_scores_keep_input_order() {
        let entries = vec![("c", 71.0), ("a", 70.0), ("d", 71.0), ("b", 71.0)];
        let groups = group_ties(entries, |(_, score)| *score);
        let names: Vec<Vec<&str>> = groups
            .iter()
            .map(|(_, members)| members.iter().map(|(name, _)| *name).collect())
            .collect();
        assert_eq!(names, vec![vec!["a"], vec!["c", "d", "b"]]);
    }

    #[test]
    fn fractional_scores_group_exactly() {
        let groups = group_ties(vec![70.5, 70.4, 70.5], |s| *s);
        let sizes: Vec<usize> = groups.iter().map(|(_, m)| m.len()).collect();
        assert_eq!(sizes, vec![1, 2]);
    }

    #[test]
    fn three_way_tie_for_first() {
        let groups = assign_positions(group_ties(vec![70.0, 70.0, 70.0, 75.0], |s| *s));
        let table = table();
        let points: Vec<f64> = groups
            .iter()
            .map(|group| average_points(group.position, group.size(), &table))
            .collect();
        assert_eq!(points, vec![500.0, 325.0]);
        assert!(groups[0].is_tied());
        assert!(!groups[1].is_tied());
        assert_eq!(groups[0].span(), 1..=3);
    }

    #[rstest]
    #[case(1, 2, 575.0)]
    #[case(2, 3, 358.3)]
    #[case(3, 3, 225.0)]
    #[case(4, 2, 162.5)]
    #[case(6, 4, 0.0)]
    fn averaged_points(#[case] position: u32, #[case] size: u32, #[case] points: f64) {
        assert_eq!(average_points(position, size, &table()), points);
    }

    #[test]
    fn single_player_is_exact_lookup() {
        let table = PointsTable::new([(1, 33.33), (2, 12.345)]).unwrap();
        assert_eq!(average_points(1, 1, &table), 33.33);
        assert_eq!(average_points(2, 1, &table), 12.345);
    }

    #[rstest]
    #[case(32.25, 32.3)]
    #[case(32.24, 32.2)]
    #[case(58.333333, 58.3)]
    #[case(66.666666, 66.7)]
    #[case(0.05, 0.1)]
    #[case(10.0, 10.0)]
    fn rounds_half_up(#[case] value: f64, #[case] expected: f64) {
        assert_eq!(round_to_tenth(value), expected);
    }

    #[test]
    fn tie_groups_conserve_points() {
        let table = PointsTable::new((1..=20).map(|p| (p, 1000.0 / p as f64))).unwrap();
        let scores = vec![
            68.0, 69.0, 69.0, 70.0, 70.0, 70.0, 71.0, 72.0, 72.0, 72.0, 72.0, 73.0, 74.0, 74.0,
        ];
        for group in assign_positions(group_ties(scores, |s| *s)) {
            let awarded =
                average_points(group.position, group.size(), &table) * group.size() as f64;
            let span: f64 = group.span().map(|p| table.points_for(p)).sum();
            assert!(
                (awarded - span).abs() <= 0.1 * group.size() as f64,
                "group at {} awarded {} for span worth {}",
                group.position,
                awarded,
                span
            );
        }
    }
}
