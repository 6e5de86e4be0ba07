use std::fmt;
use std::str::FromStr;

use crate::error::SwhidError;
use crate::hash::hash_git_object;
use crate::object_ref::ObjectRef;
use crate::swhid::{ObjectType, Swhid};

/// What a snapshot branch points to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnapshotTargetType {
    Content,
    Directory,
    Revision,
    Release,
    Snapshot,
    /// Another branch, by name.
    Alias,
    /// Nothing.
    Dangling,
}

impl SnapshotTargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SnapshotTargetType::Content => "content",
            SnapshotTargetType::Directory => "directory",
            SnapshotTargetType::Revision => "revision",
            SnapshotTargetType::Release => "release",
            SnapshotTargetType::Snapshot => "snapshot",
            SnapshotTargetType::Alias => "alias",
            SnapshotTargetType::Dangling => "dangling",
        }
    }
}

impl From<ObjectType> for SnapshotTargetType {
    fn from(object_type: ObjectType) -> Self {
        match object_type {
            ObjectType::Content => SnapshotTargetType::Content,
            ObjectType::Directory => SnapshotTargetType::Directory,
            ObjectType::Revision => SnapshotTargetType::Revision,
            ObjectType::Release => SnapshotTargetType::Release,
            ObjectType::Snapshot => SnapshotTargetType::Snapshot,
        }
    }
}

impl FromStr for SnapshotTargetType {
    type Err = SwhidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "content" => Ok(SnapshotTargetType::Content),
            "directory" => Ok(SnapshotTargetType::Directory),
            "revision" => Ok(SnapshotTargetType::Revision),
            "release" => Ok(SnapshotTargetType::Release),
            "snapshot" => Ok(SnapshotTargetType::Snapshot),
            "alias" => Ok(SnapshotTargetType::Alias),
            "dangling" => Ok(SnapshotTargetType::Dangling),
            _ => Err(SwhidError::validation(format!("invalid branch target type: {:?}", s))),
        }
    }
}

impl fmt::Display for SnapshotTargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchTarget {
    Object(ObjectRef),
    /// Name of the aliased branch.
    Name(Vec<u8>),
}

/// Snapshot branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotBranch {
    pub name: Vec<u8>,
    pub target_type: SnapshotTargetType,
    pub target: Option<BranchTarget>,
}

impl SnapshotBranch {
    pub fn new(
        name: impl Into<Vec<u8>>,
        target_type: SnapshotTargetType,
        target: Option<BranchTarget>,
    ) -> Self {
        Self {
            name: name.into(),
            target_type,
            target,
        }
    }

    /// Branch pointing at one of the five object kinds.
    pub fn object(name: impl Into<Vec<u8>>, object_type: ObjectType, target: impl Into<ObjectRef>) -> Self {
        Self::new(name, object_type.into(), Some(BranchTarget::Object(target.into())))
    }

    pub fn alias(name: impl Into<Vec<u8>>, target_name: impl Into<Vec<u8>>) -> Self {
        Self::new(
            name,
            SnapshotTargetType::Alias,
            Some(BranchTarget::Name(target_name.into())),
        )
    }

    pub fn dangling(name: impl Into<Vec<u8>>) -> Self {
        Self::new(name, SnapshotTargetType::Dangling, None)
    }

    fn payload(&self) -> Result<Vec<u8>, SwhidError> {
        match self.target_type {
            SnapshotTargetType::Alias => match &self.target {
                Some(BranchTarget::Name(name)) => Ok(name.clone()),
                Some(BranchTarget::Object(_)) => Err(SwhidError::validation(format!(
                    "alias branch {:?} must target a branch name",
                    self.display_name()
                ))),
                None => Ok(Vec::new()),
            },
            SnapshotTargetType::Dangling => Ok(Vec::new()),
            _ => match &self.target {
                Some(BranchTarget::Object(target)) => Ok(target.resolve()?.as_bytes().to_vec()),
                _ => Err(SwhidError::validation(format!(
                    "branch {:?} of type {} needs a target hash",
                    self.display_name(),
                    self.target_type
                ))),
            },
        }
    }

    fn serialize_into(&self, out: &mut Vec<u8>) -> Result<(), SwhidError> {
        let payload = self.payload()?;
        out.extend_from_slice(self.target_type.as_str().as_bytes());
        out.push(b' ');
        out.extend_from_slice(&self.name);
        out.push(0);
        out.extend_from_slice(format!("{}:", payload.len()).as_bytes());
        out.extend_from_slice(&payload);
        Ok(())
    }

    fn display_name(&self) -> String {
        String::from_utf8_lossy(&self.name).into_owned()
    }
}

/// Snapshot object
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    branches: Vec<SnapshotBranch>,
}

impl Snapshot {
    /// Branches may be given in any order.
    pub fn new(mut branches: Vec<SnapshotBranch>) -> Self {
        branches.sort_by(|a, b| a.name.cmp(&b.name));
        Self { branches }
    }

    /// Branches sorted by name.
    pub fn branches(&self) -> &[SnapshotBranch] {
        &self.branches
    }

    /// Canonical snapshot payload, without the object header.
    pub fn serialize(&self) -> Result<Vec<u8>, SwhidError> {
        let mut out = Vec::new();
        for branch in &self.branches {
            branch.serialize_into(&mut out)?;
        }
        Ok(out)
    }

    pub fn swhid(&self) -> Result<Swhid, SwhidError> {
        let payload = self.serialize()?;
        let hash = hash_git_object(ObjectType::Snapshot.git_kind(), &payload);
        Ok(Swhid::new(ObjectType::Snapshot, hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TARGET: &str = "94a9ed024d3859793618152ea559a168bbcbb5e2";

    #[test]
    fn test_empty_snapshot() {
        let swhid = Snapshot::new(vec![]).swhid().unwrap();
        assert_eq!(
            swhid.object_hash().to_hex(),
            "1a8893e6a86f444e8be8e7bda6cb34fb1735a00e"
        );
    }

    #[test]
    fn test_branch_serialization() {
        let snapshot = Snapshot::new(vec![
            SnapshotBranch::object("refs/heads/main", ObjectType::Revision, TARGET),
            SnapshotBranch::alias("HEAD", "refs/heads/main"),
            SnapshotBranch::dangling("old"),
        ]);
        let payload = snapshot.serialize().unwrap();

        let mut expected = b"alias HEAD\x0015:refs/heads/main".to_vec();
        expected.extend_from_slice(b"dangling old\x000:");
        expected.extend_from_slice(b"revision refs/heads/main\x0020:");
        expected.extend_from_slice(&hex::decode(TARGET).unwrap());
        assert_eq!(payload, expected);
    }

    #[test]
    fn test_branch_order_irrelevant() {
        let a = SnapshotBranch::object("z-branch", ObjectType::Revision, TARGET);
        let b = SnapshotBranch::object("a-branch", ObjectType::Release, TARGET);
        let one = Snapshot::new(vec![a.clone(), b.clone()]).swhid().unwrap();
        let two = Snapshot::new(vec![b, a]).swhid().unwrap();
        assert_eq!(one, two);
    }

    #[test]
    fn test_names_sort_as_raw_bytes() {
        let snapshot = Snapshot::new(vec![
            SnapshotBranch::dangling("foo0"),
            SnapshotBranch::dangling("foo/"),
            SnapshotBranch::dangling("foo"),
            SnapshotBranch::dangling("foo."),
        ]);
        let names: Vec<&[u8]> = snapshot.branches().iter().map(|b| b.name.as_slice()).collect();
        assert_eq!(names, vec![&b"foo"[..], &b"foo."[..], &b"foo/"[..], &b"foo0"[..]]);
    }

    #[test]
    fn test_invalid_branches() {
        assert!("tag".parse::<SnapshotTargetType>().unwrap_err().is_validation());

        let missing = SnapshotBranch::new("main", SnapshotTargetType::Revision, None);
        assert!(Snapshot::new(vec![missing]).swhid().unwrap_err().is_validation());

        let bad_hash = SnapshotBranch::object("main", ObjectType::Revision, "xyz");
        assert!(Snapshot::new(vec![bad_hash]).swhid().unwrap_err().is_validation());
    }

    #[test]
    fn test_alias_requires_branch_name() {
        for target in [
            ObjectRef::from(TARGET),
            ObjectRef::from(Swhid::from_parts("rev", TARGET).unwrap()),
        ] {
            let alias = SnapshotBranch::new(
                "HEAD",
                SnapshotTargetType::Alias,
                Some(BranchTarget::Object(target)),
            );
            assert!(Snapshot::new(vec![alias]).swhid().unwrap_err().is_validation());
        }
    }

    #[test]
    fn test_identifier_target() {
        let rev = Swhid::from_parts("rev", TARGET).unwrap();
        let by_swhid = SnapshotBranch::object("main", ObjectType::Revision, &rev);
        let by_hash = SnapshotBranch::object("main", ObjectType::Revision, TARGET);
        assert_eq!(
            Snapshot::new(vec![by_swhid]).swhid().unwrap(),
            Snapshot::new(vec![by_hash]).swhid().unwrap()
        );
    }
}
