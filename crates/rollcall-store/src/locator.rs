use rollcall_types::UserRecord;

/// Position of the first record whose name matches exactly.
pub fn locate(records: &[UserRecord], name: &str) -> Option<usize> {
    records.iter().position(|r| r.name == name)
}

pub fn locate_record<'a>(records: &'a [UserRecord], name: &str) -> Option<&'a UserRecord> {
    locate(records, name).map(|index| &records[index])
}
