use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

pub fn new_uuid() -> String {
    let mut bytes = [0u8; 16];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    // set version 4 and variant bits
    bytes[6] = (bytes[6] & 0x0F) | 0x40;
    bytes[8] = (bytes[8] & 0x3F) | 0x80;
    let hex: Vec<String> = bytes.iter().map(|b| format!("{:02x}", b)).collect();
    format!(
        "{}{}{}{}-{}{}-{}{}-{}{}-{}{}{}{}{}{}",
        hex[0], hex[1], hex[2], hex[3], hex[4], hex[5], hex[6], hex[7], hex[8], hex[9], hex[10],
        hex[11], hex[12], hex[13], hex[14], hex[15]
    )
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Entry {
    #[serde(default = "new_uuid")]
    pub uuid: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub expires: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Group {
    #[serde(default = "new_uuid")]
    pub uuid: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub groups: Vec<Group>,
    #[serde(default)]
    pub entries: Vec<Entry>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Database {
    #[serde(default)]
    pub root: Group,
}

impl Group {
    /// Follows child indices from this group down.
    pub fn descend(&self, indices: &[usize]) -> Option<&Group> {
        indices
            .iter()
            .try_fold(self, |group, &idx| group.groups.get(idx))
    }
}

impl Database {
    /// All entries with the names of the groups above them, depth first.
    pub fn entries(&self) -> Vec<(Vec<&str>, &Entry)> {
        let mut found = Vec::new();
        collect_entries(&self.root, &mut Vec::new(), &mut found);
        found
    }

    /// Overwrites secret material before the database is dropped.
    pub fn zeroize_secrets(&mut self) {
        zeroize_group(&mut self.root);
    }
}

fn collect_entries<'a>(
    group: &'a Group,
    trail: &mut Vec<&'a str>,
    found: &mut Vec<(Vec<&'a str>, &'a Entry)>,
) {
    for entry in &group.entries {
        found.push((trail.clone(), entry));
    }
    for child in &group.groups {
        trail.push(child.name.as_deref().unwrap_or(""));
        collect_entries(child, trail, found);
        trail.pop();
    }
}

fn zeroize_group(group: &mut Group) {
    for entry in &mut group.entries {
        if let Some(password) = entry.password.as_mut() {
            password.zeroize();
        }
        if let Some(username) = entry.username.as_mut() {
            username.zeroize();
        }
        if let Some(notes) = entry.notes.as_mut() {
            notes.zeroize();
        }
    }
    group.entries.clear();
    for child in &mut group.groups {
        zeroize_group(child);
    }
    group.groups.clear();
}
