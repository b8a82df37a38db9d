//! # test
//! An in-memory transport that records every call, for tests without a server.
//!

use std::{
    collections::{BTreeMap, HashMap, HashSet, VecDeque},
    io::Read,
};

use crate::{
    EntryKind, RawEntry, RemoteStat, Transport, TransportError, remote_path::normalize,
};

/// A call made on the mock transport.
#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    Connect,
    Disconnect,
    Pwd,
    Cwd(String),
    List(String),
    Mkdir(String),
    Rmdir(String),
    Delete(String),
    Stat(String),
    Store(String),
}

impl Call {
    /// If the call changes the remote.
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            Self::Mkdir(_) | Self::Rmdir(_) | Self::Delete(_) | Self::Store(_)
        )
    }
}

/// An injected failure.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MockFailure {
    Transient,
    Timeout,
    Permanent,
}

impl MockFailure {
    fn into_error(self, path: &str) -> TransportError {
        match self {
            Self::Transient => TransportError::Transient(format!("451 '{path}' try again")),
            Self::Timeout => TransportError::Timeout(format!("'{path}' timed out")),
            Self::Permanent => TransportError::Permanent(format!("'{path}' failed")),
        }
    }
}

/// A node of the in-memory tree.
#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    Directory,
    File(Vec<u8>),
    Link(String),
}

/// An in-memory remote.
#[derive(Clone, Debug)]
pub struct MockTransport {
    /// Every node by absolute path. The root always exists.
    pub nodes: BTreeMap<String, Node>,
    /// The working directory.
    pub current_directory: String,
    /// Every call, in order.
    pub calls: Vec<Call>,
    /// If a session is established.
    pub connected: bool,
    /// Refuse to connect.
    pub refuse_connect: bool,
    /// Failures for the next store calls, one per call.
    pub store_failures: VecDeque<MockFailure>,
    /// A failure for every store call.
    pub store_always_fails: Option<MockFailure>,
    /// Paths that can not be removed.
    pub undeletable: HashSet<String>,
    /// Directories that can not be entered.
    pub denied: HashSet<String>,
    /// Extra rows appended to the listing of a directory.
    pub extra_rows: HashMap<String, Vec<RawEntry>>,
    /// Kinds reported by stat instead of the real one.
    pub stat_overrides: HashMap<String, EntryKind>,
}

impl Default for MockTransport {
    fn default() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert("/".to_string(), Node::Directory);

        Self {
            nodes,
            current_directory: "/".to_string(),
            calls: Vec::new(),
            connected: false,
            refuse_connect: false,
            store_failures: VecDeque::new(),
            store_always_fails: None,
            undeletable: HashSet::new(),
            denied: HashSet::new(),
            extra_rows: HashMap::new(),
            stat_overrides: HashMap::new(),
        }
    }
}

impl MockTransport {
    /// A mock with only the root directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a directory and its missing parents.
    pub fn with_directory(mut self, path: &str) -> Self {
        let path = normalize(path);
        let mut current = String::new();
        for segment in path.split('/').filter(|segment| !segment.is_empty()) {
            current = format!("{current}/{segment}");
            self.nodes.entry(current.clone()).or_insert(Node::Directory);
        }
        self
    }

    /// Add a file and its missing parents.
    pub fn with_file(self, path: &str, contents: &[u8]) -> Self {
        let path = normalize(path);
        let mut mock = self.with_directory(parent(&path));
        mock.nodes.insert(path, Node::File(contents.to_vec()));
        mock
    }

    /// Add a symbolic link to `target` and its missing parents.
    pub fn with_link(self, path: &str, target: &str) -> Self {
        let path = normalize(path);
        let mut mock = self.with_directory(parent(&path));
        mock.nodes.insert(path, Node::Link(normalize(target)));
        mock
    }

    /// The calls that change the remote.
    pub fn mutating_calls(&self) -> Vec<&Call> {
        self.calls.iter().filter(|call| call.is_mutating()).collect()
    }

    /// How many calls match `predicate`.
    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|call| predicate(call)).count()
    }

    /// If a path exists.
    pub fn exists(&self, path: &str) -> bool {
        self.nodes.contains_key(&normalize(path))
    }

    /// The sorted names of the direct children of a directory.
    pub fn children(&self, path: &str) -> Vec<String> {
        let path = normalize(path);
        self.nodes
            .keys()
            .filter(|child| *child != "/" && parent(child) == path)
            .map(|child| crate::remote_path::file_name(child).to_string())
            .collect()
    }

    fn node(&self, path: &str) -> Result<&Node, TransportError> {
        self.nodes
            .get(path)
            .ok_or_else(|| TransportError::Denied(format!("550 '{path}' not found")))
    }

    fn ensure_connected(&self) -> Result<(), TransportError> {
        if self.connected {
            Ok(())
        } else {
            Err(TransportError::Permanent("not connected".into()))
        }
    }
}

impl Transport for MockTransport {
    fn describe(&self) -> String {
        "mock://test".to_string()
    }

    fn connect(&mut self) -> Result<(), TransportError> {
        self.calls.push(Call::Connect);
        if self.refuse_connect {
            return Err(TransportError::Connect("530 login incorrect".into()));
        }
        self.connected = true;
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), TransportError> {
        self.calls.push(Call::Disconnect);
        self.connected = false;
        Ok(())
    }

    fn pwd(&mut self) -> Result<String, TransportError> {
        self.calls.push(Call::Pwd);
        self.ensure_connected()?;
        Ok(self.current_directory.clone())
    }

    fn cwd(&mut self, path: &str) -> Result<(), TransportError> {
        self.calls.push(Call::Cwd(path.to_string()));
        self.ensure_connected()?;

        let path = normalize(path);
        if self.denied.contains(&path) {
            return Err(TransportError::Denied(format!("550 '{path}' permission denied")));
        }

        match self.node(&path)? {
            Node::Directory => {
                self.current_directory = path;
                Ok(())
            }
            Node::File(_) | Node::Link(_) => {
                Err(TransportError::Denied(format!("550 '{path}' not a directory")))
            }
        }
    }

    fn list(&mut self, path: &str) -> Result<Vec<RawEntry>, TransportError> {
        self.calls.push(Call::List(path.to_string()));
        self.ensure_connected()?;

        let path = normalize(path);
        if !matches!(self.node(&path)?, Node::Directory) {
            return Err(TransportError::Denied(format!("550 '{path}' not a directory")));
        }

        let mut rows = vec![
            RawEntry::Stat {
                name: ".".into(),
                stat: RemoteStat::new(EntryKind::Directory, 0),
            },
            RawEntry::Stat {
                name: "..".into(),
                stat: RemoteStat::new(EntryKind::Directory, 0),
            },
        ];

        for name in self.children(&path) {
            let child = crate::remote_path::join(&path, &name);
            let stat = match self.node(&child)? {
                Node::Directory => RemoteStat::new(EntryKind::Directory, 4096),
                Node::File(contents) => RemoteStat::new(
                    EntryKind::File,
                    u64::try_from(contents.len()).unwrap_or(u64::MAX),
                ),
                Node::Link(_) => RemoteStat::new(EntryKind::Unknown, 0),
            };
            rows.push(RawEntry::Stat { name, stat });
        }

        if let Some(extra) = self.extra_rows.get(&path) {
            rows.extend(extra.iter().cloned());
        }

        Ok(rows)
    }

    fn mkdir(&mut self, path: &str) -> Result<(), TransportError> {
        self.calls.push(Call::Mkdir(path.to_string()));
        self.ensure_connected()?;

        let path = normalize(path);
        if self.nodes.contains_key(&path) {
            return Err(TransportError::Permanent(format!("550 '{path}' exists")));
        }
        if !matches!(self.node(parent(&path))?, Node::Directory) {
            return Err(TransportError::Denied(format!("550 '{path}' has no parent")));
        }

        self.nodes.insert(path, Node::Directory);
        Ok(())
    }

    fn rmdir(&mut self, path: &str) -> Result<(), TransportError> {
        self.calls.push(Call::Rmdir(path.to_string()));
        self.ensure_connected()?;

        let path = normalize(path);
        if self.undeletable.contains(&path) {
            return Err(TransportError::Denied(format!("550 '{path}' permission denied")));
        }
        if !matches!(self.node(&path)?, Node::Directory) {
            return Err(TransportError::Denied(format!("550 '{path}' not a directory")));
        }
        if !self.children(&path).is_empty() {
            return Err(TransportError::Permanent(format!("550 '{path}' not empty")));
        }

        self.nodes.remove(&path);
        Ok(())
    }

    fn delete(&mut self, path: &str) -> Result<(), TransportError> {
        self.calls.push(Call::Delete(path.to_string()));
        self.ensure_connected()?;

        let path = normalize(path);
        if self.undeletable.contains(&path) {
            return Err(TransportError::Denied(format!("550 '{path}' permission denied")));
        }
        if matches!(self.node(&path)?, Node::Directory) {
            return Err(TransportError::Denied(format!("550 '{path}' is a directory")));
        }

        self.nodes.remove(&path);
        Ok(())
    }

    fn stat(&mut self, path: &str) -> Result<RemoteStat, TransportError> {
        self.calls.push(Call::Stat(path.to_string()));
        self.ensure_connected()?;

        let path = normalize(path);
        let node = self.node(&path)?.clone();
        let (kind, size) = match node {
            Node::Directory => (EntryKind::Directory, 4096),
            Node::File(contents) => (
                EntryKind::File,
                u64::try_from(contents.len()).unwrap_or(u64::MAX),
            ),
            Node::Link(_) => (EntryKind::Unknown, 0),
        };
        let kind = self.stat_overrides.get(&path).copied().unwrap_or(kind);

        Ok(RemoteStat::new(kind, size))
    }

    fn store_file(&mut self, path: &str, reader: &mut dyn Read) -> Result<u64, TransportError> {
        self.calls.push(Call::Store(path.to_string()));
        self.ensure_connected()?;

        let path = normalize(path);
        if let Some(failure) = self.store_failures.pop_front().or(self.store_always_fails) {
            return Err(failure.into_error(&path));
        }
        if !matches!(self.node(parent(&path))?, Node::Directory) {
            return Err(TransportError::Denied(format!("550 '{path}' has no parent")));
        }

        let mut contents = Vec::new();
        reader
            .read_to_end(&mut contents)
            .map_err(TransportError::LocalIo)?;
        let bytes = u64::try_from(contents.len()).unwrap_or(u64::MAX);

        self.nodes.insert(path, Node::File(contents));
        Ok(bytes)
    }
}

fn parent(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(index) => path.get(..index).unwrap_or("/"),
    }
}
