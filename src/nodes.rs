//! Lazy resolution cache for shared trace waypoints.
//!
//! Findings reference pool nodes by id instead of repeating identical
//! waypoint data. The pool is only worth reading when some finding actually
//! carries a reference, so the cache is built at most once per run, on first
//! lookup, with one full pass over the findings document's node-pool
//! section. Findings whose first trace entry embeds its node inline never
//! trigger the build. In-memory only; the pool is bounded by the count of
//! distinct referenced waypoints, not the finding count.

use std::cell::RefCell;
use std::collections::HashMap;

use tracing::debug;

use crate::config::NODE_POOL_PATH;
use crate::decode::Decoder;
use crate::error::Result;
use crate::fpr::FprBundle;
use crate::types::NodeRecord;
use crate::xml::PathDispatchParser;

/// Node-id → resolved waypoint cache, built lazily from the node pool.
pub struct NodeResolutionCache<'a> {
    bundle: &'a FprBundle,
    decoder: &'a Decoder,
    pool: RefCell<Option<HashMap<String, NodeRecord>>>,
}

impl<'a> NodeResolutionCache<'a> {
    /// Create an empty cache bound to one run's bundle and decoder.
    #[must_use]
    pub fn new(bundle: &'a FprBundle, decoder: &'a Decoder) -> Self {
        Self {
            bundle,
            decoder,
            pool: RefCell::new(None),
        }
    }

    /// Resolve a node id, building the cache on first use.
    ///
    /// # Returns
    /// The pool node for `id`, or `None` when the pool has no such id.
    pub fn lookup(&self, id: &str) -> Result<Option<NodeRecord>> {
        self.ensure_built()?;
        Ok(self
            .pool
            .borrow()
            .as_ref()
            .and_then(|pool| pool.get(id).cloned()))
    }

    /// Whether the pool pass has run.
    #[must_use]
    pub fn is_built(&self) -> bool {
        self.pool.borrow().is_some()
    }

    fn ensure_built(&self) -> Result<()> {
        if self.is_built() {
            return Ok(());
        }

        let mut pool: HashMap<String, NodeRecord> = HashMap::new();
        let decoder = self.decoder;
        let mut parser = PathDispatchParser::new().register(NODE_POOL_PATH, |cursor| {
            let node = decoder.node(&cursor.read_tree()?)?;
            // Duplicate ids resolve to the last-inserted record.
            pool.insert(node.id.clone(), node);
            Ok(())
        });
        parser.run(self.bundle.findings_reader()?)?;
        drop(parser);

        debug!(nodes = pool.len(), "node resolution cache built");
        *self.pool.borrow_mut() = Some(pool);
        Ok(())
    }
}
