use std::fmt;
use std::io;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::stager::{Stageable, StageIdentity, wrap};

/// Names of resources in the order they acted
pub type Journal = Arc<Mutex<Vec<String>>>;

pub fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

#[derive(Debug, Clone, Copy)]
pub struct TestStage(pub &'static str);

impl StageIdentity for TestStage {
    fn name(&self) -> &str {
        self.0
    }
}

/// Mock resource that records itself in a journal when closed
pub struct Resource {
    pub name: String,
    pub journal: Journal,
    pub fail: bool,
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

pub fn resource(name: &str, journal: &Journal) -> Arc<Resource> {
    Arc::new(Resource {
        name: name.to_string(),
        journal: Arc::clone(journal),
        fail: false,
    })
}

pub fn failing_resource(name: &str, journal: &Journal) -> Arc<Resource> {
    Arc::new(Resource {
        name: name.to_string(),
        journal: Arc::clone(journal),
        fail: true,
    })
}

pub fn close(resource: &Resource) -> Result<(), io::Error> {
    resource.journal.lock().push(resource.name.clone());
    if resource.fail {
        return Err(io::Error::other(format!("{} refused to close", resource.name)));
    }
    Ok(())
}

pub fn closing(resource: Arc<Resource>) -> Box<dyn Stageable> {
    Box::new(wrap(resource, close))
}
