// [libs/domain/fleet/src/locks.rs]
/*!
 * =================================================================
 * APARATO: NODE WRITE LATTICE (V2.0 - SERIALIZATION SHIELD)
 * CLASIFICACIÓN: DOMAIN SUPPORT (ESTRATO L2)
 * RESPONSABILIDAD: SERIALIZACIÓN DE ESCRITORES POR NODO
 *
 * # Mathematical Proof (Writer Exclusion):
 * HeartbeatProcessor y Watchdog adquieren shard(hash(node) mod N)
 * antes de cualquier lectura-modificación-escritura. Dos mutaciones
 * del mismo nodo jamás se entrelazan; nodos distintos progresan en
 * paralelo salvo colisión de fragmento.
 * =================================================================
 */

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use tokio::sync::Mutex;

/// Cardinalidad del retículo de candados por nodo.
const NODE_LOCK_SHARD_COUNT: usize = 64;

/// Retículo compartido de candados de escritura por nodo.
pub struct NodeWriteLattice {
    shards: Vec<Mutex<()>>,
}

impl Default for NodeWriteLattice {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeWriteLattice {
    pub fn new() -> Self {
        Self { shards: (0..NODE_LOCK_SHARD_COUNT).map(|_| Mutex::new(())).collect() }
    }

    /// Candado gobernante de las escrituras del nodo dado.
    pub fn lock_for(&self, node_id: &str) -> &Mutex<()> {
        let mut hasher = DefaultHasher::new();
        node_id.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) % NODE_LOCK_SHARD_COUNT]
    }
}
