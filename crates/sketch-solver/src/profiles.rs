use std::collections::VecDeque;

use model_types::{
    points_coincide, ClosedProfileGroup, ElementEnd, OpenPathGroup, Point2, ProfileChain,
    SketchElement, Traversal,
};
use uuid::Uuid;

/// Endpoints closer than this (world units) are joined into one chain.
pub const PROFILE_TOLERANCE: f64 = 0.5;

/// Namespace for chain ids, so the same chain always gets the same id.
const CHAIN_NAMESPACE: Uuid = Uuid::from_u128(0x6c1f_9a0e_52d4_4b8e_9f3a_0d17_c2b4_e851);

/// Closed loops and open chains found in one set of sketch elements.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectedProfiles {
    pub closed: Vec<ClosedProfileGroup>,
    pub open: Vec<OpenPathGroup>,
}

/// Classify sketch elements into closed profiles and open paths.
///
/// 1. Rectangles and circles are closed on their own; each becomes a
///    single-element closed profile.
/// 2. Chainable elements (lines, arcs, splines) are linked wherever two ends
///    coincide within `tolerance`.
/// 3. Linked elements are grouped into connected components.
/// 4. A component is a loop when every member has exactly one link at its start
///    and one at its end (a single element must close on itself). Loops are walked
///    into an ordered chain.
/// 5. Components that are simple chains (no end with more than one link) become
///    open paths, walked from a free end. Branched components yield neither.
///
/// The result depends only on the input order.
pub fn detect_profiles(elements: &[SketchElement], tolerance: f64) -> DetectedProfiles {
    let mut detected = DetectedProfiles::default();

    for element in elements.iter().filter(|e| !e.is_chainable()) {
        detected
            .closed
            .push(make_chain(vec![(element.id(), Traversal::Forward)], true));
    }

    let chainable: Vec<ChainElement> = elements
        .iter()
        .filter_map(|element| {
            element.endpoints().map(|(start, end)| ChainElement {
                id: element.id(),
                start,
                end,
            })
        })
        .collect();

    if chainable.is_empty() {
        return detected;
    }

    let links = link_endpoints(&chainable, tolerance);

    for members in connected_components(&links) {
        if members.len() == 1 {
            let only = &chainable[members[0]];
            let closed = points_coincide(only.start, only.end, tolerance);
            let chain = make_chain(vec![(only.id, Traversal::Forward)], closed);
            if closed {
                detected.closed.push(chain);
            } else {
                detected.open.push(chain);
            }
            continue;
        }

        if is_loop(&members, &links) {
            let walk = walk_chain(members[0], Traversal::Forward, &links);
            if walk.len() < members.len() {
                tracing::debug!(
                    visited = walk.len(),
                    members = members.len(),
                    "closed profile walk halted early"
                );
            }
            detected.closed.push(make_chain(ids_of(&walk, &chainable), true));
        } else if is_simple_chain(&members, &links) {
            let (first, direction) = free_end(&members, &links);
            let walk = walk_chain(first, direction, &links);
            detected.open.push(make_chain(ids_of(&walk, &chainable), false));
        } else {
            tracing::debug!(members = members.len(), "branched chain skipped");
        }
    }

    detected
}

#[derive(Debug, Clone, Copy)]
struct ChainElement {
    id: Uuid,
    start: Point2,
    end: Point2,
}

impl ChainElement {
    fn point(&self, end: ElementEnd) -> Point2 {
        match end {
            ElementEnd::Start => self.start,
            ElementEnd::End => self.end,
        }
    }
}

/// A coincidence between one end of an element and one end of another.
#[derive(Debug, Clone, Copy)]
struct Link {
    other: usize,
    at: ElementEnd,
    other_at: ElementEnd,
}

const ENDS: [ElementEnd; 2] = [ElementEnd::Start, ElementEnd::End];

fn link_endpoints(elements: &[ChainElement], tolerance: f64) -> Vec<Vec<Link>> {
    let mut links: Vec<Vec<Link>> = vec![Vec::new(); elements.len()];
    for i in 0..elements.len() {
        for j in (i + 1)..elements.len() {
            for at in ENDS {
                for other_at in ENDS {
                    if points_coincide(elements[i].point(at), elements[j].point(other_at), tolerance)
                    {
                        links[i].push(Link {
                            other: j,
                            at,
                            other_at,
                        });
                        links[j].push(Link {
                            other: i,
                            at: other_at,
                            other_at: at,
                        });
                    }
                }
            }
        }
    }
    links
}

/// Breadth-first components, seeded in input order; members sorted ascending.
fn connected_components(links: &[Vec<Link>]) -> Vec<Vec<usize>> {
    let mut seen = vec![false; links.len()];
    let mut components = Vec::new();

    for seed in 0..links.len() {
        if seen[seed] {
            continue;
        }
        seen[seed] = true;
        let mut members = vec![seed];
        let mut queue = VecDeque::from([seed]);
        while let Some(current) = queue.pop_front() {
            for link in &links[current] {
                if !seen[link.other] {
                    seen[link.other] = true;
                    members.push(link.other);
                    queue.push_back(link.other);
                }
            }
        }
        members.sort_unstable();
        components.push(members);
    }

    components
}

fn count_at(links: &[Link], end: ElementEnd) -> usize {
    links.iter().filter(|l| l.at == end).count()
}

fn is_loop(members: &[usize], links: &[Vec<Link>]) -> bool {
    members.iter().all(|&m| {
        links[m].len() == 2
            && count_at(&links[m], ElementEnd::Start) == 1
            && count_at(&links[m], ElementEnd::End) == 1
    })
}

fn is_simple_chain(members: &[usize], links: &[Vec<Link>]) -> bool {
    members.iter().all(|&m| {
        count_at(&links[m], ElementEnd::Start) <= 1 && count_at(&links[m], ElementEnd::End) <= 1
    })
}

/// The first member with an unlinked end, and the direction that starts there.
fn free_end(members: &[usize], links: &[Vec<Link>]) -> (usize, Traversal) {
    for &m in members {
        if count_at(&links[m], ElementEnd::Start) == 0 {
            return (m, Traversal::Forward);
        }
        if count_at(&links[m], ElementEnd::End) == 0 {
            return (m, Traversal::Reversed);
        }
    }
    (members[0], Traversal::Forward)
}

/// Walk from `first`, always leaving through the end opposite the one entered and
/// following the unvisited link there. Stops when no such link exists.
fn walk_chain(first: usize, direction: Traversal, links: &[Vec<Link>]) -> Vec<(usize, Traversal)> {
    let mut visited = vec![false; links.len()];
    visited[first] = true;
    let mut walk = vec![(first, direction)];
    let mut current = first;
    let mut exit = direction.exit();

    while let Some(next) = links[current]
        .iter()
        .find(|l| l.at == exit && !visited[l.other])
    {
        let entered = Traversal::entering_at(next.other_at);
        visited[next.other] = true;
        walk.push((next.other, entered));
        current = next.other;
        exit = entered.exit();
    }

    walk
}

fn ids_of(walk: &[(usize, Traversal)], elements: &[ChainElement]) -> Vec<(Uuid, Traversal)> {
    walk.iter()
        .map(|&(index, direction)| (elements[index].id, direction))
        .collect()
}

fn make_chain(members: Vec<(Uuid, Traversal)>, closed: bool) -> ProfileChain {
    let mut seed = Vec::with_capacity(1 + members.len() * 16);
    seed.push(u8::from(closed));
    for (id, _) in &members {
        seed.extend_from_slice(id.as_bytes());
    }
    let (element_ids, directions) = members.into_iter().unzip();
    ProfileChain {
        id: Uuid::new_v5(&CHAIN_NAMESPACE, &seed),
        element_ids,
        directions,
        closed,
    }
}
