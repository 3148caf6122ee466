use crate::error::SimError;
use crate::mobility::{Vec2, Walker};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::Ipv4Addr;

pub type NodeId = u32;
pub type ClusterId = u32;
pub type InterfaceId = u32;

/// The delivery tracker dispatches on this when it builds relay paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeRole {
    Plain,
    ClusterHead,
    Bridge,
}

/// A /24 address block owned by one cluster. The block is an independent
/// configuration field: nothing derives it from the cluster's radio range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AddrBlock {
    pub base: Ipv4Addr,
}

impl AddrBlock {
    pub fn new(second: u8, third: u8) -> Self {
        Self {
            base: Ipv4Addr::new(10, second, third, 0),
        }
    }

    pub fn host(&self, index: u32) -> Ipv4Addr {
        debug_assert!(index > 0 && index < 255);
        let o = self.base.octets();
        Ipv4Addr::new(o[0], o[1], o[2], index as u8)
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub role: NodeRole,
    pub cluster: Option<ClusterId>,
    pub position: Vec2,
    pub walker: Option<Walker>,
    pub radio_range_m: f64,
    pub addr: Ipv4Addr,
    pub iface: InterfaceId,
}

impl Node {
    pub fn velocity(&self) -> Vec2 {
        self.walker.as_ref().map_or(Vec2::ZERO, |w| w.velocity())
    }
}

#[derive(Debug, Clone)]
pub struct Cluster {
    pub id: ClusterId,
    pub members: Vec<NodeId>,
    pub head: Option<NodeId>,
    pub radio_range_m: f64,
    pub block: AddrBlock,
    next_host: u32,
}

/// Registry of every node in the simulation: identities, roles, cluster
/// membership and address assignment. Nodes are created at setup and
/// never destroyed during a run.
#[derive(Debug, Default)]
pub struct Topology {
    nodes: Vec<Node>,
    clusters: Vec<Cluster>,
    bridge: Option<NodeId>,
    by_addr: HashMap<Ipv4Addr, NodeId>,
    next_iface: InterfaceId,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_cluster(
        &mut self,
        radio_range_m: f64,
        block: AddrBlock,
    ) -> Result<ClusterId, SimError> {
        if self.clusters.iter().any(|c| c.block == block) {
            return Err(SimError::AddressConflict { addr: block.base });
        }
        let id = self.clusters.len() as ClusterId;
        self.clusters.push(Cluster {
            id,
            members: Vec::new(),
            head: None,
            radio_range_m,
            block,
            next_host: 1,
        });
        Ok(id)
    }

    /// Adds a node to a cluster, allocating the next host address out of
    /// the cluster's block.
    ///
    /// Panics if `cluster` does not exist.
    pub fn add_member(
        &mut self,
        cluster: ClusterId,
        position: Vec2,
        walker: Option<Walker>,
    ) -> Result<NodeId, SimError> {
        let id = self.nodes.len() as NodeId;
        let (addr, range) = {
            let c = &self.clusters[cluster as usize];
            if c.next_host >= 255 {
                return Err(SimError::AddressConflict {
                    addr: c.block.host(254),
                });
            }
            (c.block.host(c.next_host), c.radio_range_m)
        };
        self.claim_addr(addr, id)?;

        let iface = self.alloc_iface();
        self.nodes.push(Node {
            id,
            role: NodeRole::Plain,
            cluster: Some(cluster),
            position,
            walker,
            radio_range_m: range,
            addr,
            iface,
        });
        let c = &mut self.clusters[cluster as usize];
        c.members.push(id);
        c.next_host += 1;
        Ok(id)
    }

    /// Promotes a member to cluster-head. A previous head, if any, is
    /// demoted so the one-head-per-cluster invariant holds.
    ///
    /// Panics if `cluster` or `node` does not exist.
    pub fn assign_head(&mut self, cluster: ClusterId, node: NodeId) {
        debug_assert_eq!(self.nodes[node as usize].cluster, Some(cluster));
        if let Some(prev) = self.clusters[cluster as usize].head {
            self.nodes[prev as usize].role = NodeRole::Plain;
        }
        self.nodes[node as usize].role = NodeRole::ClusterHead;
        self.clusters[cluster as usize].head = Some(node);
    }

    /// Registers the inter-cluster bridge node. The bridge belongs to no
    /// cluster and carries its own radio range and address.
    pub fn add_bridge(
        &mut self,
        position: Vec2,
        radio_range_m: f64,
        addr: Ipv4Addr,
        walker: Option<Walker>,
    ) -> Result<NodeId, SimError> {
        let id = self.nodes.len() as NodeId;
        self.claim_addr(addr, id)?;
        let iface = self.alloc_iface();
        self.nodes.push(Node {
            id,
            role: NodeRole::Bridge,
            cluster: None,
            position,
            walker,
            radio_range_m,
            addr,
            iface,
        });
        self.bridge = Some(id);
        Ok(id)
    }

    /// Panics if `node` does not exist.
    pub fn address_for(&self, node: NodeId) -> Ipv4Addr {
        self.nodes[node as usize].addr
    }

    pub fn resolve(&self, addr: Ipv4Addr) -> Option<NodeId> {
        self.by_addr.get(&addr).copied()
    }

    /// Panics if `id` does not exist.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id as usize]
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn nodes_mut(&mut self) -> &mut [Node] {
        &mut self.nodes
    }

    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    pub fn bridge(&self) -> Option<NodeId> {
        self.bridge
    }

    pub fn head_of(&self, cluster: ClusterId) -> Option<NodeId> {
        self.clusters.get(cluster as usize).and_then(|c| c.head)
    }

    /// The i-th member added to a cluster, in creation order.
    ///
    /// Panics if the cluster or index does not exist: a dangling node
    /// reference in a scenario is a programming error, not a runtime
    /// condition.
    pub fn member(&self, cluster: ClusterId, index: u32) -> NodeId {
        self.clusters[cluster as usize].members[index as usize]
    }

    fn claim_addr(&mut self, addr: Ipv4Addr, node: NodeId) -> Result<(), SimError> {
        if self.by_addr.contains_key(&addr) {
            return Err(SimError::AddressConflict { addr });
        }
        self.by_addr.insert(addr, node);
        Ok(())
    }

    fn alloc_iface(&mut self) -> InterfaceId {
        let iface = self.next_iface;
        self.next_iface += 1;
        iface
    }
}
