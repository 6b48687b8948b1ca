use std::collections::HashSet;

use tracing::{debug, trace};

use crate::ir::{Diagram, ElementId, ProcessId};

/// In/out neighbour lists indexed by element, detached from the diagram.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Adjacency {
    inset: Vec<Vec<ElementId>>,
    outset: Vec<Vec<ElementId>>,
}

impl Adjacency {
    /// Snapshot of the flows between `elements`. Self-loops are left out.
    pub fn from_diagram(diagram: &Diagram, elements: &[ElementId]) -> Self {
        let count = diagram.elements().len();
        let mut adjacency = Self {
            inset: vec![Vec::new(); count],
            outset: vec![Vec::new(); count],
        };
        for &element in elements {
            let source = diagram.element(element);
            adjacency.inset[element.0] = source
                .inset
                .iter()
                .copied()
                .filter(|&p| p != element)
                .collect();
            adjacency.outset[element.0] = source
                .outset
                .iter()
                .copied()
                .filter(|&s| s != element)
                .collect();
        }
        adjacency
    }

    pub fn inset(&self, element: ElementId) -> &[ElementId] {
        &self.inset[element.0]
    }

    pub fn outset(&self, element: ElementId) -> &[ElementId] {
        &self.outset[element.0]
    }

    pub fn is_join(&self, element: ElementId) -> bool {
        self.inset[element.0].len() > 1
    }

    pub fn is_split(&self, element: ElementId) -> bool {
        self.outset[element.0].len() > 1
    }

    pub fn has_edge(&self, source: ElementId, target: ElementId) -> bool {
        self.outset[source.0].contains(&target)
    }

    /// Turns `source -> target` into `target -> source`. Returns false when
    /// the edge does not exist.
    fn reverse(&mut self, source: ElementId, target: ElementId) -> bool {
        if !self.has_edge(source, target) {
            return false;
        }
        self.outset[source.0].retain(|&e| e != target);
        self.inset[target.0].retain(|&e| e != source);
        if !self.inset[source.0].contains(&target) {
            self.inset[source.0].push(target);
        }
        if !self.outset[target.0].contains(&source) {
            self.outset[target.0].push(source);
        }
        true
    }
}

/// Orders the elements of one process so that every element comes after its
/// predecessors, breaking cycles by reversing loop-closing flows.
///
/// The diagram is never touched: the sorter works on its own adjacency copy,
/// which [`TopologicalSorter::adjacency`] exposes in its acyclic form until
/// [`TopologicalSorter::restore_edges`] resets it.
#[derive(Debug, Clone)]
pub struct TopologicalSorter {
    elements: Vec<ElementId>,
    original: Adjacency,
    working: Adjacency,
    backward: Vec<(ElementId, ElementId)>,
}

struct Pass {
    sorted: Vec<ElementId>,
    backward: Vec<(ElementId, ElementId)>,
}

impl TopologicalSorter {
    pub fn new(diagram: &Diagram, process: ProcessId) -> Self {
        let elements = diagram.process(process).elements.clone();
        let original = Adjacency::from_diagram(diagram, &elements);
        Self {
            elements,
            working: original.clone(),
            original,
            backward: Vec::new(),
        }
    }

    /// Runs the discovery pass (with backpatching) and the real pass.
    pub fn sorted_elements(&mut self) -> Vec<ElementId> {
        let discovery = self.pass();
        let patched = self.backpatch(&discovery.backward);
        for (source, target) in patched {
            self.reverse_working(source, target);
        }
        let real = self.pass();
        for &(source, target) in &real.backward {
            self.reverse_working(source, target);
        }
        debug!(
            elements = real.sorted.len(),
            backward = self.backward.len(),
            "sorted process elements"
        );
        real.sorted
    }

    /// Flows reversed in the working adjacency, in their original direction.
    pub fn backward_edges(&self) -> &[(ElementId, ElementId)] {
        &self.backward
    }

    /// Current working adjacency; acyclic after [`Self::sorted_elements`].
    pub fn adjacency(&self) -> &Adjacency {
        &self.working
    }

    pub fn restore_edges(&mut self) {
        self.working = self.original.clone();
        self.backward.clear();
    }

    fn reverse_working(&mut self, source: ElementId, target: ElementId) {
        if !self.working.reverse(source, target) {
            return;
        }
        trace!(?source, ?target, "reversed flow");
        // Reversing an already reversed flow restores it.
        if let Some(pos) = self
            .backward
            .iter()
            .position(|&edge| edge == (target, source))
        {
            self.backward.remove(pos);
        } else {
            self.backward.push((source, target));
        }
    }

    /// One Kahn-style pass over a throwaway copy of the working adjacency.
    fn pass(&self) -> Pass {
        let mut shadow = self.working.clone();
        let starting: Vec<usize> = self
            .elements
            .iter()
            .map(|&e| shadow.inset(e).len())
            .collect();
        let mut remaining: Vec<(ElementId, usize)> =
            self.elements.iter().copied().zip(starting).collect();
        let mut sorted = Vec::with_capacity(remaining.len());
        let mut backward = Vec::new();

        while !remaining.is_empty() {
            let free: Vec<ElementId> = remaining
                .iter()
                .filter(|(e, _)| shadow.inset(*e).is_empty())
                .map(|(e, _)| *e)
                .collect();
            if !free.is_empty() {
                remaining.retain(|(e, _)| !free.contains(e));
                for element in free {
                    sorted.push(element);
                    let successors = std::mem::take(&mut shadow.outset[element.0]);
                    for successor in successors {
                        shadow.inset[successor.0].retain(|&p| p != element);
                    }
                }
                continue;
            }

            let Some(entry) = loop_entry(&remaining, &shadow) else {
                // Unreachable for a well-formed adjacency; keep the pass total.
                sorted.extend(remaining.iter().map(|(e, _)| *e));
                break;
            };
            let preds = shadow.inset(entry).to_vec();
            for pred in preds {
                shadow.reverse(pred, entry);
                backward.push((pred, entry));
            }
        }
        Pass { sorted, backward }
    }

    /// Walks each backward edge's source further back through single-in
    /// single-out elements, so the cut lands at the loop entry.
    fn backpatch(&self, discovered: &[(ElementId, ElementId)]) -> Vec<(ElementId, ElementId)> {
        let mut edges: Vec<(ElementId, ElementId)> = discovered.to_vec();
        let mut visited: HashSet<ElementId> = HashSet::new();
        for &(start, entry) in discovered {
            let mut source = start;
            while self.working.inset(source).len() <= 1 && self.working.outset(source).len() <= 1 {
                let Some(&pred) = self.working.inset(source).first() else {
                    break;
                };
                if pred == entry || !visited.insert(source) {
                    break;
                }
                edges.push((pred, source));
                source = pred;
            }
        }
        let mut seen = HashSet::new();
        edges.retain(|edge| seen.insert(*edge));
        edges
    }
}

/// A join that has already lost an incoming flow, else any element still
/// waiting on a predecessor.
fn loop_entry(remaining: &[(ElementId, usize)], shadow: &Adjacency) -> Option<ElementId> {
    remaining
        .iter()
        .find(|(e, starting)| *starting > 1 && shadow.inset(*e).len() < *starting)
        .or_else(|| remaining.iter().find(|(e, _)| !shadow.inset(*e).is_empty()))
        .map(|(e, _)| *e)
}
