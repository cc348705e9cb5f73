use crate::reader::{Field, FieldValue, Record};
use anyhow::anyhow;
use std::cmp::Ordering;
use std::fmt;

/// Value of the grouping field. Numbers sort before text.
#[derive(Debug, Clone)]
pub enum GroupKey {
    Number(f64),
    Text(String),
}

impl GroupKey {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            GroupKey::Number(x) => Some(*x),
            GroupKey::Text(_) => None,
        }
    }
}

impl From<FieldValue<'_>> for GroupKey {
    fn from(value: FieldValue<'_>) -> Self {
        match value {
            FieldValue::Number(x) => GroupKey::Number(x),
            FieldValue::Text(s) => GroupKey::Text(s.to_string()),
        }
    }
}

impl Ord for GroupKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (GroupKey::Number(a), GroupKey::Number(b)) => a.total_cmp(b),
            (GroupKey::Text(a), GroupKey::Text(b)) => a.cmp(b),
            (GroupKey::Number(_), GroupKey::Text(_)) => Ordering::Less,
            (GroupKey::Text(_), GroupKey::Number(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for GroupKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for GroupKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for GroupKey {}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Number(x) => write!(f, "{}", x),
            GroupKey::Text(s) => f.write_str(s),
        }
    }
}

/// Records sharing one key value.
#[derive(Debug, Clone)]
pub struct Group<'r> {
    pub key: GroupKey,
    pub records: Vec<&'r Record>,
}

/// Partition `records` by `field`: sort by key (stable), then cut at every
/// key change. Groups come out in ascending key order and records keep their
/// input order within a group.
pub fn group_by<'r, I>(records: I, field: Field) -> anyhow::Result<Vec<Group<'r>>>
where
    I: IntoIterator<Item = &'r Record>,
{
    let mut keyed = Vec::new();
    for record in records {
        let value = record
            .get(field)
            .ok_or_else(|| anyhow!("cannot group by {}: record has no such field: {:?}", field, record))?;
        keyed.push((GroupKey::from(value), record));
    }
    keyed.sort_by(|a, b| a.0.cmp(&b.0));

    let mut groups: Vec<Group<'r>> = Vec::new();
    for (key, record) in keyed {
        match groups.last_mut() {
            Some(group) if group.key == key => group.records.push(record),
            _ => groups.push(Group {
                key,
                records: vec![record],
            }),
        }
    }
    Ok(groups)
}

/// Result of grouping by several fields in turn.
#[derive(Debug, Clone)]
pub enum GroupTree<'r> {
    Leaf(Vec<&'r Record>),
    Branch(Vec<(GroupKey, GroupTree<'r>)>),
}

/// Group by `fields[0]`, then each group by `fields[1]`, and so on.
pub fn group_nested<'r>(records: Vec<&'r Record>, fields: &[Field]) -> anyhow::Result<GroupTree<'r>> {
    let Some((&field, rest)) = fields.split_first() else {
        return Ok(GroupTree::Leaf(records));
    };

    let mut groups = Vec::new();
    for group in group_by(records, field)? {
        groups.push((group.key, group_nested(group.records, rest)?));
    }
    Ok(GroupTree::Branch(groups))
}

impl<'r> GroupTree<'r> {
    /// Sub-groups of a branch; empty for a leaf.
    pub fn children(&self) -> &[(GroupKey, GroupTree<'r>)] {
        match self {
            GroupTree::Leaf(_) => &[],
            GroupTree::Branch(groups) => groups,
        }
    }

    /// Records of a leaf; empty for a branch.
    pub fn records(&self) -> &[&'r Record] {
        match self {
            GroupTree::Leaf(records) => records,
            GroupTree::Branch(_) => &[],
        }
    }

    /// Every leaf with the key path leading to it, in key order.
    #[cfg(test)]
    pub fn leaves(&self) -> Vec<(Vec<GroupKey>, &[&'r Record])> {
        let mut out = Vec::new();
        self.collect_leaves(&mut Vec::new(), &mut out);
        out
    }

    #[cfg(test)]
    fn collect_leaves<'t>(
        &'t self,
        path: &mut Vec<GroupKey>,
        out: &mut Vec<(Vec<GroupKey>, &'t [&'r Record])>,
    ) {
        match self {
            GroupTree::Leaf(records) => out.push((path.clone(), records.as_slice())),
            GroupTree::Branch(groups) => {
                for (key, sub) in groups {
                    path.push(key.clone());
                    sub.collect_leaves(path, out);
                    path.pop();
                }
            }
        }
    }

    #[cfg(test)]
    pub fn flatten(&self) -> Vec<&'r Record> {
        self.leaves()
            .into_iter()
            .flat_map(|(_, records)| records.iter().copied())
            .collect()
    }
}
