use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use super::filename::ParsedName;

// ---------------------------------------------------------------------------
// RunKey – identity of a run
// ---------------------------------------------------------------------------

/// The `(sub, ses, task, condition, run)` identity of a run.
///
/// Absent fields compare equal to each other, so two files without a `task`
/// token still land in the same run if everything else matches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RunKey {
    pub subject: Option<String>,
    pub session: Option<String>,
    pub task: Option<String>,
    pub condition: Option<String>,
    pub run: Option<String>,
}

impl RunKey {
    pub fn from_parsed(parsed: &ParsedName) -> Self {
        let field = |key: &str| parsed.get(key).map(str::to_string);
        RunKey {
            subject: field("sub"),
            session: field("ses"),
            task: field("task"),
            condition: field("condition"),
            run: field("run"),
        }
    }

    /// All five identity fields are absent.
    pub fn is_anonymous(&self) -> bool {
        self.fields().iter().all(|(_, v)| v.is_none())
    }

    fn fields(&self) -> [(&'static str, Option<&str>); 5] {
        [
            ("sub", self.subject.as_deref()),
            ("ses", self.session.as_deref()),
            ("task", self.task.as_deref()),
            ("condition", self.condition.as_deref()),
            ("run", self.run.as_deref()),
        ]
    }
}

impl fmt::Display for RunKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_anonymous() {
            return write!(f, "<anonymous run>");
        }
        let parts: Vec<String> = self
            .fields()
            .iter()
            .filter_map(|(k, v)| v.map(|v| format!("{k}-{v}")))
            .collect();
        write!(f, "{}", parts.join("_"))
    }
}

// ---------------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------------

/// A file found under `processed/` together with its decoded name.
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    pub path: PathBuf,
    pub parsed: ParsedName,
}

/// All files sharing one [`RunKey`], in input order.
#[derive(Debug, Clone)]
pub struct RunGroup {
    pub key: RunKey,
    pub files: Vec<DiscoveredFile>,
}

#[derive(Debug, Clone, Default)]
pub struct Grouping {
    /// Groups in first-seen order.
    pub groups: Vec<RunGroup>,
    /// Files whose name carried no `key-value` token at all.
    pub unparseable: Vec<PathBuf>,
}

/// Bucket files by exact [`RunKey`] equality.
pub fn group_runs<I>(files: I) -> Grouping
where
    I: IntoIterator<Item = DiscoveredFile>,
{
    let mut grouping = Grouping::default();
    let mut index: HashMap<RunKey, usize> = HashMap::new();

    for file in files {
        if file.parsed.is_empty() {
            grouping.unparseable.push(file.path);
            continue;
        }
        let key = RunKey::from_parsed(&file.parsed);
        match index.get(&key) {
            Some(&i) => grouping.groups[i].files.push(file),
            None => {
                index.insert(key.clone(), grouping.groups.len());
                grouping.groups.push(RunGroup {
                    key,
                    files: vec![file],
                });
            }
        }
    }

    grouping
}
