// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core tree implementation: arena, addressing, registration and aggregation.

use hashbrown::HashMap;
use habitat_patch::{AnimalSpeciesId, Channel, MoistureSource, ResourceSpeciesId};
use kurbo::{Point, Rect};
use tracing::debug;

use crate::animal::AnimalRecord;
use crate::cell::{BranchBody, Cell, CellBody, LeafBody};
use crate::coord::{CHILDREN_PER_BRANCH, CellCoord, TreeLayout};
use crate::element::{
    CellElement, HabitatDomainStatus, MoistureInfo, ObstacleFlag, Resource, ResourceSummary,
    max_priority,
};
use crate::error::TreeError;
use crate::types::{AnimalId, CellId, MoistureSourceId};

/// Adaptive region tree over a square world.
///
/// The tree starts as a single root leaf (or a uniform grid, see
/// [`TerrainTree::subdivide_to`]) and refines itself where animals are inserted.
/// Cells are addressed by generational [`CellId`]s; a leaf that is promoted
/// to a branch gives up its id.
///
/// ## Example
///
/// ```rust
/// use habitat_tree::{CellCoord, TerrainTree, TreeLayout};
///
/// let layout = TreeLayout::new(8, 1.0).unwrap();
/// let mut tree = TerrainTree::new(layout);
/// tree.subdivide_to(2).unwrap();
///
/// let cell = tree.locate(CellCoord::new([3, 1], 2)).unwrap();
/// assert!(tree.cell(cell).unwrap().is_leaf());
/// assert_eq!(tree.leaves().count(), 16);
/// ```
pub struct TerrainTree {
    pub(crate) layout: TreeLayout,
    /// slots
    nodes: Vec<Option<Cell>>,
    /// last generation per slot (persists across frees)
    generations: Vec<u32>,
    free_list: Vec<usize>,
    pub(crate) root: CellId,
    capacity_per_depth: Vec<usize>,
    pub(crate) resource_species: Vec<ResourceSpeciesId>,
    /// Finest depth promotion may reach, per instar.
    pub(crate) animal_species: HashMap<AnimalSpeciesId, Vec<u32>>,
    pub(crate) moisture_sources: Vec<MoistureSource>,
    pub(crate) animals: HashMap<AnimalId, AnimalRecord>,
    pub(crate) next_animal_id: u64,
}

impl core::fmt::Debug for TerrainTree {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let total = self.nodes.len();
        let alive = self.nodes.iter().filter(|n| n.is_some()).count();
        f.debug_struct("TerrainTree")
            .field("layout", &self.layout)
            .field("nodes_total", &total)
            .field("nodes_alive", &alive)
            .field("free_list", &self.free_list.len())
            .field("resource_species", &self.resource_species)
            .field("moisture_sources", &self.moisture_sources.len())
            .field("animals", &self.animals.len())
            .finish_non_exhaustive()
    }
}

impl TerrainTree {
    /// A tree holding only the root leaf.
    pub fn new(layout: TreeLayout) -> Self {
        let mut tree = Self {
            layout,
            nodes: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
            root: CellId::new(0, 0),
            capacity_per_depth: Vec::new(),
            resource_species: Vec::new(),
            animal_species: HashMap::new(),
            moisture_sources: Vec::new(),
            animals: HashMap::new(),
            next_animal_id: 0,
        };
        let root = tree.blank_cell(CellCoord::ROOT, None, CellBody::Leaf(LeafBody::default()));
        tree.root = tree.alloc(root);
        tree
    }

    /// Geometry of the tree.
    pub fn layout(&self) -> &TreeLayout {
        &self.layout
    }

    /// The root cell.
    pub fn root(&self) -> CellId {
        self.root
    }

    /// Returns true if `id` refers to a live cell.
    pub fn is_alive(&self, id: CellId) -> bool {
        self.nodes
            .get(id.idx())
            .and_then(|n| n.as_ref())
            .map(|n| n.generation == id.1)
            .unwrap_or(false)
    }

    /// Read-only view of a live cell.
    pub fn cell(&self, id: CellId) -> Option<CellRef<'_>> {
        self.is_alive(id).then(|| CellRef {
            tree: self,
            id,
            cell: self.node(id),
        })
    }

    /// Parent of a live cell; `None` for the root or stale ids.
    pub fn parent_of(&self, id: CellId) -> Option<CellId> {
        if !self.is_alive(id) {
            return None;
        }
        self.node(id).parent
    }

    /// Children of a live branch; empty for leaves and stale ids.
    pub fn children_of(&self, id: CellId) -> &[CellId] {
        if !self.is_alive(id) {
            return &[];
        }
        match self.node(id).children() {
            Some(children) => children,
            None => &[],
        }
    }

    /// Next cell in depth-first order, children in orthant order.
    ///
    /// Returns `None` at the end of the traversal or for stale ids.
    pub fn next_depth_first(&self, current: CellId) -> Option<CellId> {
        if !self.is_alive(current) {
            return None;
        }
        if let Some(children) = self.node(current).children() {
            return Some(children[0]);
        }
        let mut node = current;
        while let Some(parent) = self.node(node).parent {
            if let Some(next_sibling) = self.next_sibling(node, parent) {
                return Some(next_sibling);
            }
            node = parent;
        }
        None
    }

    fn next_sibling(&self, node: CellId, parent: CellId) -> Option<CellId> {
        let siblings = self.node(parent).children()?;
        let pos = siblings.iter().position(|&id| id == node)?;
        siblings.get(pos + 1).copied()
    }

    /// Every live cell, depth first from the root.
    pub fn depth_first(&self) -> impl Iterator<Item = CellId> + '_ {
        core::iter::successors(Some(self.root), |&id| self.next_depth_first(id))
    }

    /// Every leaf, depth first.
    pub fn leaves(&self) -> impl Iterator<Item = CellId> + '_ {
        self.depth_first().filter(|&id| self.node(id).is_leaf())
    }

    /// Leaves below `id` (itself if it is a leaf).
    pub fn leaves_under(&self, id: CellId) -> Vec<CellId> {
        let mut out = Vec::new();
        if self.is_alive(id) {
            self.collect_leaves(id, &mut out);
        }
        out
    }

    fn collect_leaves(&self, id: CellId, out: &mut Vec<CellId>) {
        match self.node(id).children() {
            Some(children) => {
                for &child in children {
                    self.collect_leaves(child, out);
                }
            }
            None => out.push(id),
        }
    }

    /// Number of live cells.
    pub fn cell_count(&self) -> usize {
        self.nodes.len() - self.free_list.len()
    }

    /// Resolve `target` starting from `start`.
    ///
    /// Climbs from `start` until reaching a cell that contains `target`, then
    /// descends toward it. When the tree is coarser than `target` there, the
    /// containing leaf is returned.
    pub fn get_cell(&self, start: CellId, target: CellCoord) -> Result<CellId, TreeError> {
        if !self.layout.contains_coord(&target) {
            return Err(TreeError::CoordOutOfBounds(target));
        }
        if !self.is_alive(start) {
            return Err(TreeError::StaleCell(start));
        }
        let mut current = start;
        while !target.is_within(&self.node(current).coord) {
            match self.node(current).parent {
                Some(parent) => current = parent,
                None => break,
            }
        }
        loop {
            let cell = self.node(current);
            let (Some(children), Some(index)) =
                (cell.children(), cell.coord.child_index_toward(&target))
            else {
                return Ok(current);
            };
            current = children[index];
        }
    }

    /// Resolve `target` from the root.
    pub fn locate(&self, target: CellCoord) -> Result<CellId, TreeError> {
        self.get_cell(self.root, target)
    }

    /// The leaf containing `point`.
    pub fn leaf_at(&self, point: Point) -> Result<CellId, TreeError> {
        let coord = self
            .layout
            .obtain_point_map(point, self.layout.finest_depth())?;
        self.locate(coord)
    }

    /// Number of animals a leaf at `depth` holds before it reports crowding.
    pub fn capacity(&self, depth: u32) -> usize {
        self.capacity_per_depth
            .get(depth as usize)
            .copied()
            .unwrap_or(usize::MAX)
    }

    /// Set per-depth leaf capacities; depths past the end are unlimited.
    pub fn set_capacity_per_depth(&mut self, capacities: Vec<usize>) -> Result<(), TreeError> {
        if capacities.len() > self.layout.map_depth() as usize {
            return Err(TreeError::CapacityTable(format!(
                "{} entries for a tree of depth {}",
                capacities.len(),
                self.layout.map_depth()
            )));
        }
        if let Some(depth) = capacities.iter().position(|&c| c == 0) {
            return Err(TreeError::CapacityTable(format!(
                "capacity at depth {depth} must be at least 1"
            )));
        }
        self.capacity_per_depth = capacities;
        Ok(())
    }

    /// Promote every leaf shallower than `depth`, giving a uniform grid at least that fine.
    pub fn subdivide_to(&mut self, depth: u32) -> Result<(), TreeError> {
        if depth >= self.layout.map_depth() {
            return Err(TreeError::InvalidLayout(format!(
                "initial depth {depth} exceeds the finest depth {}",
                self.layout.finest_depth()
            )));
        }
        loop {
            let shallow: Vec<CellId> = self
                .leaves()
                .filter(|&id| self.node(id).coord.depth() < depth)
                .collect();
            if shallow.is_empty() {
                return Ok(());
            }
            for leaf in shallow {
                self.promote(leaf);
            }
        }
    }

    /// Add a resource slot to every cell; returns the slot index.
    ///
    /// Registering a species twice returns the existing slot.
    pub fn register_resource_species(&mut self, species: ResourceSpeciesId) -> usize {
        if let Some(slot) = self.resource_slot(species) {
            return slot;
        }
        self.resource_species.push(species);
        for cell in self.nodes.iter_mut().flatten() {
            match &mut cell.body {
                CellBody::Leaf(leaf) => leaf.resources.push(CellElement::new(Resource::empty(species))),
                CellBody::Branch(branch) => branch
                    .resources
                    .push(CellElement::new(ResourceSummary::empty(species))),
            }
        }
        debug!(%species, slot = self.resource_species.len() - 1, "registered resource species");
        self.resource_species.len() - 1
    }

    /// Slot index of a registered resource species.
    pub fn resource_slot(&self, species: ResourceSpeciesId) -> Option<usize> {
        self.resource_species.iter().position(|&s| s == species)
    }

    /// Registered resource species in slot order.
    pub fn resource_species(&self) -> &[ResourceSpeciesId] {
        &self.resource_species
    }

    /// Register an animal species with the cell depth each instar is filed at.
    ///
    /// Every cell starts out habitable for every instar of the species.
    pub fn register_animal_species(
        &mut self,
        species: AnimalSpeciesId,
        cell_depth_per_instar: Vec<u32>,
    ) -> Result<(), TreeError> {
        if cell_depth_per_instar.is_empty() {
            return Err(TreeError::InvalidSpecies(format!(
                "species {species} needs at least one instar"
            )));
        }
        if let Some(depth) = cell_depth_per_instar
            .iter()
            .find(|&&d| d >= self.layout.map_depth())
        {
            return Err(TreeError::InvalidSpecies(format!(
                "species {species} asks for depth {depth}, the finest is {}",
                self.layout.finest_depth()
            )));
        }
        let instars = cell_depth_per_instar.len();
        for cell in self.nodes.iter_mut().flatten() {
            cell.habitat.value_mut().register_species(species, instars);
        }
        self.animal_species.insert(species, cell_depth_per_instar);
        debug!(%species, instars, "registered animal species");
        Ok(())
    }

    /// A registered moisture source.
    pub fn moisture_source(&self, id: MoistureSourceId) -> Option<&MoistureSource> {
        self.moisture_sources.get(id.idx())
    }

    /// Advance every moisture source by one simulation step.
    pub fn update_moisture(&mut self) {
        for source in &mut self.moisture_sources {
            source.update();
        }
    }

    pub(crate) fn register_moisture_source(&mut self, source: MoistureSource) -> MoistureSourceId {
        #[allow(
            clippy::cast_possible_truncation,
            reason = "moisture sources are indexed with u32."
        )]
        let id = MoistureSourceId(self.moisture_sources.len() as u32);
        self.moisture_sources.push(source);
        id
    }

    /// A fresh cell carrying the tree's registered species.
    pub(crate) fn blank_cell(&self, coord: CellCoord, parent: Option<CellId>, mut body: CellBody) -> Cell {
        match &mut body {
            CellBody::Leaf(leaf) if leaf.resources.is_empty() => {
                leaf.resources = self
                    .resource_species
                    .iter()
                    .map(|&s| CellElement::new(Resource::empty(s)))
                    .collect();
            }
            CellBody::Branch(branch) if branch.resources.is_empty() => {
                branch.resources = self
                    .resource_species
                    .iter()
                    .map(|&s| CellElement::new(ResourceSummary::empty(s)))
                    .collect();
            }
            _ => {}
        }
        let mut habitat = HabitatDomainStatus::default();
        for (species, depths) in &self.animal_species {
            habitat.register_species(*species, depths.len());
        }
        Cell {
            generation: 0,
            coord,
            parent,
            effective_area: self.layout.effective_area(&coord),
            moisture: CellElement::new(MoistureInfo::Null),
            obstacle: CellElement::new(ObstacleFlag::default()),
            habitat: CellElement::new(habitat),
            body,
        }
    }

    pub(crate) fn alloc(&mut self, mut cell: Cell) -> CellId {
        let (idx, generation) = if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            cell.generation = generation;
            self.nodes[idx] = Some(cell);
            #[allow(
                clippy::cast_possible_truncation,
                reason = "cell slots are indexed with u32."
            )]
            (idx as u32, generation)
        } else {
            let generation = 1_u32;
            cell.generation = generation;
            self.nodes.push(Some(cell));
            self.generations.push(generation);
            #[allow(
                clippy::cast_possible_truncation,
                reason = "cell slots are indexed with u32."
            )]
            ((self.nodes.len() - 1) as u32, generation)
        };
        CellId::new(idx, generation)
    }

    /// Take a cell out of the arena; its id becomes stale.
    pub(crate) fn release(&mut self, id: CellId) -> Cell {
        let cell = self.nodes[id.idx()].take().expect("dangling CellId");
        self.free_list.push(id.idx());
        cell
    }

    /// Access a cell; panics if `id` is stale.
    pub(crate) fn node(&self, id: CellId) -> &Cell {
        self.nodes[id.idx()].as_ref().expect("dangling CellId")
    }

    /// Access a cell mutably; panics if `id` is stale.
    pub(crate) fn node_mut(&mut self, id: CellId) -> &mut Cell {
        self.nodes[id.idx()].as_mut().expect("dangling CellId")
    }

    pub(crate) fn checked(&self, id: CellId) -> Result<&Cell, TreeError> {
        if self.is_alive(id) {
            Ok(self.node(id))
        } else {
            Err(TreeError::StaleCell(id))
        }
    }

    /// Recompute a branch from its children, for one channel or all of them.
    pub(crate) fn refresh_branch(&mut self, id: CellId, channel: Option<Channel>) {
        let Some(children) = self.node(id).children().copied() else {
            return;
        };
        let cells: [&Cell; CHILDREN_PER_BRANCH] = children.map(|c| self.node(c));
        let wants = |c: Channel| channel.is_none_or(|ch| ch == c);

        let obstacle = wants(Channel::Obstacle).then(|| {
            let flags = cells.map(|c| *c.obstacle.value());
            CellElement::with_priority(
                ObstacleFlag::aggregate(&flags),
                max_priority(cells.iter().map(|c| &c.obstacle)),
            )
        });
        let moisture = wants(Channel::Moisture).then(|| {
            let infos = cells.map(|c| *c.moisture.value());
            CellElement::with_priority(
                MoistureInfo::aggregate(&infos),
                max_priority(cells.iter().map(|c| &c.moisture)),
            )
        });
        let habitat = wants(Channel::HabitatDomain).then(|| {
            let statuses = cells.map(|c| c.habitat.value());
            CellElement::with_priority(
                HabitatDomainStatus::aggregate(&statuses),
                max_priority(cells.iter().map(|c| &c.habitat)),
            )
        });
        let resources = wants(Channel::Resource).then(|| {
            self.resource_species
                .iter()
                .enumerate()
                .map(|(slot, &species)| {
                    let totals = cells.map(|c| {
                        c.resource_totals(slot)
                            .unwrap_or(ResourceSummary::empty(species))
                    });
                    let priority = cells
                        .iter()
                        .map(|c| c.resource_priority(slot))
                        .max()
                        .unwrap_or(0);
                    CellElement::with_priority(ResourceSummary::aggregate(species, &totals), priority)
                })
                .collect::<Vec<_>>()
        });

        let branch = self.node_mut(id);
        if let Some(obstacle) = obstacle {
            branch.obstacle = obstacle;
        }
        if let Some(moisture) = moisture {
            branch.moisture = moisture;
        }
        if let Some(habitat) = habitat {
            branch.habitat = habitat;
        }
        if let (Some(resources), CellBody::Branch(body)) = (resources, &mut branch.body) {
            body.resources = resources;
        }
    }

    /// Allocate a childless branch at `coord` and hang it where `old` was.
    pub(crate) fn install_branch(
        &mut self,
        old: CellId,
        coord: CellCoord,
        parent: Option<CellId>,
    ) -> CellId {
        let placeholder = [CellId::new(u32::MAX, 0); CHILDREN_PER_BRANCH];
        let branch = self.blank_cell(
            coord,
            parent,
            CellBody::Branch(BranchBody {
                children: placeholder,
                resources: Vec::new(),
            }),
        );
        let id = self.alloc(branch);
        match parent {
            Some(parent) => {
                if let CellBody::Branch(body) = &mut self.node_mut(parent).body
                    && let Some(slot) = body.children.iter_mut().find(|c| **c == old)
                {
                    *slot = id;
                }
            }
            None => self.root = id,
        }
        id
    }

    pub(crate) fn set_children(&mut self, branch: CellId, children: [CellId; CHILDREN_PER_BRANCH]) {
        if let CellBody::Branch(body) = &mut self.node_mut(branch).body {
            body.children = children;
        }
    }

    /// Nominal box of a live cell.
    pub(crate) fn nominal_box(&self, id: CellId) -> Rect {
        self.layout.make_box(&self.node(id).coord, false)
    }
}

/// Read-only view of one cell.
#[derive(Clone, Copy)]
pub struct CellRef<'a> {
    tree: &'a TerrainTree,
    id: CellId,
    cell: &'a Cell,
}

impl core::fmt::Debug for CellRef<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CellRef")
            .field("id", &self.id)
            .field("coord", &self.cell.coord)
            .field("leaf", &self.cell.is_leaf())
            .finish_non_exhaustive()
    }
}

impl<'a> CellRef<'a> {
    /// Handle of the cell.
    pub fn id(&self) -> CellId {
        self.id
    }

    /// Coordinate of the cell.
    pub fn coord(&self) -> CellCoord {
        self.cell.coord
    }

    /// Parent handle, `None` at the root.
    pub fn parent(&self) -> Option<CellId> {
        self.cell.parent
    }

    /// True for leaves.
    pub fn is_leaf(&self) -> bool {
        self.cell.is_leaf()
    }

    /// Children in orthant order; empty for leaves.
    pub fn children(&self) -> &'a [CellId] {
        self.tree.children_of(self.id)
    }

    /// Epsilon-shrunk box used for coverage tests.
    pub fn effective_area(&self) -> Rect {
        self.cell.effective_area
    }

    /// Moisture channel.
    pub fn moisture(&self) -> &'a CellElement<MoistureInfo> {
        &self.cell.moisture
    }

    /// Obstacle channel.
    pub fn obstacle(&self) -> &'a CellElement<ObstacleFlag> {
        &self.cell.obstacle
    }

    /// Habitat-domain channel.
    pub fn habitat_domain(&self) -> &'a CellElement<HabitatDomainStatus> {
        &self.cell.habitat
    }

    /// True for obstacle leaves and majority-obstacle branches.
    pub fn is_obstacle(&self) -> bool {
        self.cell.obstacle.value().obstacle
    }

    /// Biomass and capacity of `species` in this cell, summed for branches.
    pub fn resource(&self, species: ResourceSpeciesId) -> Option<ResourceSummary> {
        self.cell.resource_totals(self.tree.resource_slot(species)?)
    }

    /// Priority of the last write to the `species` slot.
    pub fn resource_priority(&self, species: ResourceSpeciesId) -> Option<usize> {
        Some(self.cell.resource_priority(self.tree.resource_slot(species)?))
    }

    /// Full resource state of a leaf slot.
    pub fn leaf_resource(&self, species: ResourceSpeciesId) -> Option<&'a Resource> {
        let slot = self.tree.resource_slot(species)?;
        self.cell
            .leaf()?
            .resources
            .get(slot)
            .map(CellElement::value)
    }

    /// Animals filed in this cell or below.
    pub fn animal_count(&self) -> usize {
        self.tree
            .leaves_under(self.id)
            .into_iter()
            .filter_map(|leaf| self.tree.node(leaf).leaf().map(|l| l.occupancy.len()))
            .sum()
    }
}
