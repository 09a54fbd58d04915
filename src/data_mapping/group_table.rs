use std::collections::HashMap;

use crate::config::GroupRank;
use crate::config::defaults::DEFAULT_GROUP_RANKS;
use crate::errors::AppResult;
use crate::models::Group;

/// Rank given to groups missing from the table; sorts after every known group
pub const UNKNOWN_GROUP_RANK: u32 = u32::MAX;

/// Group label to sort rank. Lower ranks sort first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupTable {
    ranks: HashMap<Group, u32>,
}

impl GroupTable {
    pub fn from_ranks(ranks: &[GroupRank]) -> AppResult<Self> {
        let ranks = ranks
            .iter()
            .map(|r| Ok((r.label.parse::<Group>()?, r.rank)))
            .collect::<AppResult<HashMap<_, _>>>()?;
        Ok(Self { ranks })
    }

    pub fn rank(&self, group: &Group) -> u32 {
        self.ranks.get(group).copied().unwrap_or(UNKNOWN_GROUP_RANK)
    }

    pub fn contains(&self, group: &Group) -> bool {
        self.ranks.contains_key(group)
    }

    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }
}

impl Default for GroupTable {
    fn default() -> Self {
        let ranks = DEFAULT_GROUP_RANKS
            .iter()
            .map(|(label, rank)| {
                let (region, category) = label.split_once(" | ").unwrap_or((label, ""));
                (Group::new(region, category), *rank)
            })
            .collect();
        Self { ranks }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_ranks() {
        let table = GroupTable::default();
        assert_eq!(table.rank(&Group::new("中国大陆", "央视")), 1);
        assert_eq!(table.rank(&Group::new("中国香港", "综合")), 10);
        assert_eq!(table.rank(&Group::new("中国大陆", "其他")), 99);
        assert_eq!(table.len(), DEFAULT_GROUP_RANKS.len());
    }

    #[test]
    fn test_unknown_group_sorts_last() {
        let table = GroupTable::default();
        let unknown = table.rank(&Group::new("火星", "综合"));
        assert_eq!(unknown, UNKNOWN_GROUP_RANK);
        assert!(DEFAULT_GROUP_RANKS.iter().all(|(_, rank)| *rank < unknown));
    }

    #[test]
    fn test_from_config_ranks() {
        let table = GroupTable::from_ranks(&[
            GroupRank {
                label: "A | x".into(),
                rank: 7,
            },
            GroupRank {
                label: "B | y".into(),
                rank: 3,
            },
        ])
        .unwrap();
        assert_eq!(table.rank(&Group::new("A", "x")), 7);
        assert_eq!(table.rank(&Group::new("B", "y")), 3);
        assert!(!table.contains(&Group::new("中国大陆", "央视")));
    }

    #[test]
    fn test_from_config_rejects_bad_label() {
        let result = GroupTable::from_ranks(&[GroupRank {
            label: "no separator".into(),
            rank: 1,
        }]);
        assert!(result.is_err());
    }
}
