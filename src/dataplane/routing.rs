//! Routing table backed by a longest-prefix-match trie

use std::fmt;
use std::net::Ipv4Addr;

/// Static route loaded from the route table file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    /// Destination network
    pub prefix: Ipv4Addr,
    /// Contiguous network mask
    pub mask: Ipv4Addr,
    /// Gateway whose link address the packet is sent to
    pub next_hop: Ipv4Addr,
    /// Egress interface id
    pub interface: usize,
}

impl RouteEntry {
    pub fn new(prefix: Ipv4Addr, mask: Ipv4Addr, next_hop: Ipv4Addr, interface: usize) -> Self {
        Self {
            prefix,
            mask,
            next_hop,
            interface,
        }
    }

    pub fn prefix_len(&self) -> u32 {
        mask_length(self.mask)
    }

    /// Whether `addr` falls inside this route's network
    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        let mask = u32::from(self.mask);
        u32::from(addr) & mask == u32::from(self.prefix) & mask
    }

    /// Whether the prefix has bits set outside the mask
    pub fn has_host_bits(&self) -> bool {
        u32::from(self.prefix) & !u32::from(self.mask) != 0
    }
}

impl fmt::Display for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} via {} dev {}",
            self.prefix,
            self.prefix_len(),
            self.next_hop,
            self.interface
        )
    }
}

/// Number of leading one bits of a mask (its prefix length)
pub fn mask_length(mask: Ipv4Addr) -> u32 {
    u32::from(mask).leading_ones()
}

/// Whether `mask` is a run of ones followed by a run of zeros
pub fn is_contiguous(mask: Ipv4Addr) -> bool {
    let bits = u32::from(mask);
    bits.leading_ones() + bits.trailing_zeros() == 32
}

/// Bit `depth` of `addr`, counted from the most significant bit
fn bit_at(addr: u32, depth: u32) -> usize {
    ((addr >> (31 - depth)) & 1) as usize
}

#[derive(Debug, Default)]
struct TrieNode {
    children: [Option<usize>; 2],
    route: Option<RouteEntry>,
}

/// Binary trie over route prefixes.
///
/// Nodes live in a flat arena and refer to their children by index. A route
/// is stored at depth `mask_length(mask)`, so both insert and lookup touch at
/// most 33 nodes regardless of table size.
#[derive(Debug)]
pub struct LpmTrie {
    nodes: Vec<TrieNode>,
    routes: usize,
}

impl LpmTrie {
    pub fn new() -> Self {
        Self {
            nodes: vec![TrieNode::default()],
            routes: 0,
        }
    }

    /// Store a route, replacing any earlier route with the same prefix and
    /// mask. The replaced route is returned.
    pub fn insert(&mut self, route: RouteEntry) -> Option<RouteEntry> {
        let key = u32::from(route.prefix);
        let mut current = 0;

        for depth in 0..route.prefix_len() {
            let bit = bit_at(key, depth);
            current = match self.nodes[current].children[bit] {
                Some(child) => child,
                None => {
                    let child = self.nodes.len();
                    self.nodes.push(TrieNode::default());
                    self.nodes[current].children[bit] = Some(child);
                    child
                }
            };
        }

        let replaced = self.nodes[current].route.replace(route);
        if replaced.is_none() {
            self.routes += 1;
        }
        replaced
    }

    /// Longest-prefix match for `addr`
    pub fn lookup(&self, addr: Ipv4Addr) -> Option<&RouteEntry> {
        let key = u32::from(addr);
        let mut best: Option<&RouteEntry> = None;
        let mut current = 0;
        let mut depth = 0;

        loop {
            if let Some(route) = &self.nodes[current].route {
                if best.map_or(true, |b| u32::from(route.mask) > u32::from(b.mask)) {
                    best = Some(route);
                }
            }

            if depth == 32 {
                break;
            }

            match self.nodes[current].children[bit_at(key, depth)] {
                Some(child) => current = child,
                None => break,
            }
            depth += 1;
        }

        best
    }

    /// Iterate over stored routes
    pub fn routes(&self) -> impl Iterator<Item = &RouteEntry> {
        self.nodes.iter().filter_map(|node| node.route.as_ref())
    }

    pub fn len(&self) -> usize {
        self.routes
    }

    pub fn is_empty(&self) -> bool {
        self.routes == 0
    }
}

impl Default for LpmTrie {
    fn default() -> Self {
        Self::new()
    }
}

impl FromIterator<RouteEntry> for LpmTrie {
    fn from_iter<I: IntoIterator<Item = RouteEntry>>(iter: I) -> Self {
        let mut trie = LpmTrie::new();
        for route in iter {
            trie.insert(route);
        }
        trie
    }
}
