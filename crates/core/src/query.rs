//! Search filters for structures and tasks.
//!
//! A filter lowers into a flat list of [`Predicate`]s. Column names come from a
//! closed enum and are the only text ever placed into a query; values are
//! carried separately so adapters can only bind them. The in-memory store
//! evaluates the same predicates directly against records.

use serde::{Deserialize, Serialize};

use crate::id::{GroupId, StructureId, UserId};
use crate::model::{Structure, Task};

/// Searchable columns.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Column {
    Name,
    Description,
    District,
    Region,
    Address,
    Kind,
    State,
    Area,
    Owner,
    ActualUser,
    Gid,
    Deadline,
    Status,
    Object,
    Maintainer,
}

impl Column {
    pub fn as_sql(self) -> &'static str {
        match self {
            Column::Name => "name",
            Column::Description => "description",
            Column::District => "district",
            Column::Region => "region",
            Column::Address => "address",
            Column::Kind => "kind",
            Column::State => "state",
            Column::Area => "area",
            Column::Owner => "owner",
            Column::ActualUser => "actual_user",
            Column::Gid => "gid",
            Column::Deadline => "deadline",
            Column::Status => "status",
            Column::Object => "object",
            Column::Maintainer => "maintainer",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Op {
    Eq,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Op {
    pub fn as_sql(self) -> &'static str {
        match self {
            Op::Eq => "=",
            Op::Lt => "<",
            Op::Le => "<=",
            Op::Gt => ">",
            Op::Ge => ">=",
        }
    }

    fn holds<T: Ord + ?Sized>(self, lhs: &T, rhs: &T) -> bool {
        match self {
            Op::Eq => lhs == rhs,
            Op::Lt => lhs < rhs,
            Op::Le => lhs <= rhs,
            Op::Gt => lhs > rhs,
            Op::Ge => lhs >= rhs,
        }
    }
}

/// A value to be bound, never interpolated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Text(String),
    Int(i64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub column: Column,
    pub op: Op,
    pub value: Value,
}

impl Predicate {
    pub fn new(column: Column, op: Op, value: Value) -> Self {
        Self { column, op, value }
    }

    /// Evaluate against a record. A column the record does not have, or a
    /// value of the wrong kind, never matches.
    pub fn matches(&self, record: &impl Searchable) -> bool {
        match (record.field(self.column), &self.value) {
            (Some(Value::Text(lhs)), Value::Text(rhs)) => self.op.holds(lhs.as_str(), rhs.as_str()),
            (Some(Value::Int(lhs)), Value::Int(rhs)) => self.op.holds(&lhs, rhs),
            _ => false,
        }
    }
}

/// Records that can be filtered by [`Predicate`]s.
pub trait Searchable {
    fn field(&self, column: Column) -> Option<Value>;
}

impl Searchable for Structure {
    fn field(&self, column: Column) -> Option<Value> {
        let text = |s: &String| Some(Value::Text(s.clone()));
        match column {
            Column::Name => text(&self.name),
            Column::Description => text(&self.description),
            Column::District => text(&self.district),
            Column::Region => text(&self.region),
            Column::Address => text(&self.address),
            Column::Kind => text(&self.kind),
            Column::State => text(&self.state),
            Column::Area => Some(Value::Int(i64::from(self.area))),
            Column::Owner => text(&self.owner),
            Column::ActualUser => text(&self.actual_user),
            Column::Gid => Some(Value::Int(self.gid.get())),
            Column::Deadline | Column::Status | Column::Object | Column::Maintainer => None,
        }
    }
}

impl Searchable for Task {
    fn field(&self, column: Column) -> Option<Value> {
        match column {
            Column::Name => Some(Value::Text(self.name.clone())),
            Column::Description => Some(Value::Text(self.description.clone())),
            Column::Status => Some(Value::Text(self.status.clone())),
            Column::Deadline => Some(Value::Int(self.deadline)),
            Column::Object => Some(Value::Int(self.object.get())),
            Column::Maintainer => Some(Value::Int(self.maintainer.get())),
            Column::Gid => Some(Value::Int(self.gid.get())),
            _ => None,
        }
    }
}

/// Sort direction by record id.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        }
    }
}

/// Pagination parameters for searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub limit: u32,
    pub offset: u32,
    pub order: SortOrder,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: Self::DEFAULT_LIMIT,
            offset: 0,
            order: SortOrder::Ascending,
        }
    }
}

impl Pagination {
    pub const DEFAULT_LIMIT: u32 = 50;
    pub const MAX_LIMIT: u32 = 1000;

    pub fn new(limit: Option<u32>, offset: Option<u32>, ascending: Option<bool>) -> Self {
        Self {
            limit: limit.unwrap_or(Self::DEFAULT_LIMIT).min(Self::MAX_LIMIT),
            offset: offset.unwrap_or(0),
            order: match ascending {
                Some(false) => SortOrder::Descending,
                _ => SortOrder::Ascending,
            },
        }
    }
}

/// Structure search criteria. Every present field narrows the result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructureFilter {
    pub name: Option<String>,
    pub description: Option<String>,
    pub district: Option<String>,
    pub region: Option<String>,
    pub address: Option<String>,
    pub kind: Option<String>,
    pub state: Option<String>,
    pub area_from: Option<i32>,
    pub area_to: Option<i32>,
    pub owner: Option<String>,
    pub actual_user: Option<String>,
    pub gid: Option<GroupId>,
}

impl StructureFilter {
    /// Lower into predicates.
    ///
    /// Area bounds: both present is an inclusive range, a lone upper bound is
    /// strict `<`, a lone lower bound is strict `>`.
    pub fn predicates(&self) -> Vec<Predicate> {
        let mut out = Vec::new();
        let texts = [
            (Column::Name, &self.name),
            (Column::Description, &self.description),
            (Column::District, &self.district),
            (Column::Region, &self.region),
            (Column::Address, &self.address),
            (Column::Kind, &self.kind),
            (Column::State, &self.state),
            (Column::Owner, &self.owner),
            (Column::ActualUser, &self.actual_user),
        ];
        for (column, value) in texts {
            if let Some(v) = value {
                out.push(Predicate::new(column, Op::Eq, Value::Text(v.clone())));
            }
        }

        match (self.area_from, self.area_to) {
            (Some(from), Some(to)) => {
                out.push(Predicate::new(Column::Area, Op::Ge, Value::Int(from.into())));
                out.push(Predicate::new(Column::Area, Op::Le, Value::Int(to.into())));
            }
            (None, Some(to)) => out.push(Predicate::new(Column::Area, Op::Lt, Value::Int(to.into()))),
            (Some(from), None) => {
                out.push(Predicate::new(Column::Area, Op::Gt, Value::Int(from.into())))
            }
            (None, None) => {}
        }

        if let Some(gid) = self.gid {
            out.push(Predicate::new(Column::Gid, Op::Eq, Value::Int(gid.get())));
        }
        out
    }
}

/// Task search criteria.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub name: Option<String>,
    pub status: Option<String>,
    pub object: Option<StructureId>,
    pub maintainer: Option<UserId>,
    pub gid: Option<GroupId>,
    pub deadline_from: Option<i64>,
    pub deadline_to: Option<i64>,
}

impl TaskFilter {
    /// Lower into predicates. Deadline bounds are inclusive.
    pub fn predicates(&self) -> Vec<Predicate> {
        let mut out = Vec::new();
        if let Some(name) = &self.name {
            out.push(Predicate::new(Column::Name, Op::Eq, Value::Text(name.clone())));
        }
        if let Some(status) = &self.status {
            out.push(Predicate::new(Column::Status, Op::Eq, Value::Text(status.clone())));
        }
        if let Some(object) = self.object {
            out.push(Predicate::new(Column::Object, Op::Eq, Value::Int(object.get())));
        }
        if let Some(maintainer) = self.maintainer {
            out.push(Predicate::new(Column::Maintainer, Op::Eq, Value::Int(maintainer.get())));
        }
        if let Some(gid) = self.gid {
            out.push(Predicate::new(Column::Gid, Op::Eq, Value::Int(gid.get())));
        }
        if let Some(from) = self.deadline_from {
            out.push(Predicate::new(Column::Deadline, Op::Ge, Value::Int(from)));
        }
        if let Some(to) = self.deadline_to {
            out.push(Predicate::new(Column::Deadline, Op::Le, Value::Int(to)));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_object::PermissionMask;

    fn structure(area: i32) -> Structure {
        Structure {
            id: StructureId::new(1),
            name: "Depot".into(),
            description: "bus depot".into(),
            district: "East".into(),
            region: "R2".into(),
            address: "5 Side Rd".into(),
            kind: "garage".into(),
            state: "ok".into(),
            area,
            owner: "city".into(),
            actual_user: "transit".into(),
            gid: GroupId::new(4),
            permissions: PermissionMask::default(),
        }
    }

    #[test]
    fn empty_filter_has_no_predicates() {
        assert!(StructureFilter::default().predicates().is_empty());
        assert!(TaskFilter::default().predicates().is_empty());
    }

    #[test]
    fn area_range_is_inclusive_when_both_bounds_present() {
        let filter = StructureFilter { area_from: Some(100), area_to: Some(200), ..Default::default() };
        let preds = filter.predicates();
        assert!(preds.iter().all(|p| p.matches(&structure(100))));
        assert!(preds.iter().all(|p| p.matches(&structure(200))));
        assert!(!preds.iter().all(|p| p.matches(&structure(201))));
    }

    #[test]
    fn lone_area_bounds_are_strict() {
        let upper = StructureFilter { area_to: Some(100), ..Default::default() }.predicates();
        assert!(!upper[0].matches(&structure(100)));
        assert!(upper[0].matches(&structure(99)));

        let lower = StructureFilter { area_from: Some(100), ..Default::default() }.predicates();
        assert!(!lower[0].matches(&structure(100)));
        assert!(lower[0].matches(&structure(101)));
    }

    #[test]
    fn text_and_group_predicates_match_exactly() {
        let filter = StructureFilter {
            district: Some("East".into()),
            gid: Some(GroupId::new(4)),
            ..Default::default()
        };
        assert!(filter.predicates().iter().all(|p| p.matches(&structure(1))));

        let other = StructureFilter { district: Some("West".into()), ..Default::default() };
        assert!(!other.predicates()[0].matches(&structure(1)));
    }

    #[test]
    fn columns_absent_on_a_record_never_match() {
        let p = Predicate::new(Column::Status, Op::Eq, Value::Text("open".into()));
        assert!(!p.matches(&structure(1)));
    }

    #[test]
    fn pagination_caps_limit_and_maps_order() {
        let page = Pagination::new(Some(5000), Some(10), Some(false));
        assert_eq!(page.limit, Pagination::MAX_LIMIT);
        assert_eq!(page.offset, 10);
        assert_eq!(page.order, SortOrder::Descending);
        assert_eq!(Pagination::new(None, None, None), Pagination::default());
    }
}
