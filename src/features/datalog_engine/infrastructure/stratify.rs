//! Stratification: orders predicates into strata so every negated
//! occurrence sees the full extension of what it negates before it runs
//! (§4.5 "Semantics").

use std::collections::{HashMap, HashSet};

use crate::errors::DatalogError;
use crate::features::datalog_engine::domain::Rule;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Edge {
    from: usize,
    negative: bool,
}

/// Assigns each predicate a stratum number. Predicates in the same
/// strongly-connected component of the dependency graph share a stratum
/// (mutual positive recursion, e.g. `Reachable`, is evaluated together); a
/// negative edge inside an SCC is a negation cycle and fails with
/// [`DatalogError::Stratification`].
pub fn stratify(rules: &[Rule]) -> Result<HashMap<String, usize>, DatalogError> {
    let mut index_of: HashMap<String, usize> = HashMap::new();
    let mut names: Vec<String> = Vec::new();
    let mut intern = |name: &str, index_of: &mut HashMap<String, usize>, names: &mut Vec<String>| -> usize {
        if let Some(&i) = index_of.get(name) {
            return i;
        }
        let i = names.len();
        names.push(name.to_string());
        index_of.insert(name.to_string(), i);
        i
    };

    for rule in rules {
        intern(&rule.head.predicate, &mut index_of, &mut names);
        for atom in &rule.positive_body {
            intern(&atom.predicate, &mut index_of, &mut names);
        }
        for atom in &rule.negated_body {
            intern(&atom.predicate, &mut index_of, &mut names);
        }
    }

    let n = names.len();
    let mut adjacency: Vec<Vec<Edge>> = vec![Vec::new(); n];
    for rule in rules {
        let head = index_of[&rule.head.predicate];
        for atom in &rule.positive_body {
            adjacency_push(&mut adjacency, index_of[&atom.predicate], head, false);
        }
        for atom in &rule.negated_body {
            adjacency_push(&mut adjacency, index_of[&atom.predicate], head, true);
        }
    }

    let sccs = tarjan_scc(n, &adjacency);
    let mut component_of = vec![0usize; n];
    for (component_id, members) in sccs.iter().enumerate() {
        for &m in members {
            component_of[m] = component_id;
        }
    }

    // A negative edge whose endpoints land in the same SCC closes a cycle
    // through negation.
    for predicate_idx in 0..n {
        for edge in &adjacency[predicate_idx] {
            if edge.negative && component_of[edge.from] == component_of[predicate_idx] {
                return Err(DatalogError::Stratification { predicate: names[predicate_idx].clone() });
            }
        }
    }

    // Condensation DAG: stratum[component] = max over incoming edges of
    // (source stratum + 1 if negative else 0).
    let mut component_stratum = vec![0usize; sccs.len()];
    let topo = topological_order_of_components(sccs.len(), &adjacency, &component_of);
    for &component_id in &topo {
        for &member in &sccs[component_id] {
            for edge in &adjacency[member] {
                let source_component = component_of[edge.from];
                if source_component == component_id {
                    continue;
                }
                let candidate = component_stratum[source_component] + if edge.negative { 1 } else { 0 };
                component_stratum[component_id] = component_stratum[component_id].max(candidate);
            }
        }
    }

    let mut result = HashMap::new();
    for (i, name) in names.iter().enumerate() {
        result.insert(name.clone(), component_stratum[component_of[i]]);
    }
    Ok(result)
}

fn adjacency_push(adjacency: &mut [Vec<Edge>], from: usize, to: usize, negative: bool) {
    adjacency[to].push(Edge { from, negative });
}

/// Iterative Tarjan SCC (avoids recursion depth limits on deep rule sets).
fn tarjan_scc(n: usize, adjacency: &[Vec<Edge>]) -> Vec<Vec<usize>> {
    let mut index_counter = 0usize;
    let mut stack: Vec<usize> = Vec::new();
    let mut on_stack = vec![false; n];
    let mut indices = vec![None; n];
    let mut lowlink = vec![0usize; n];
    let mut sccs = Vec::new();

    for start in 0..n {
        if indices[start].is_some() {
            continue;
        }
        // (node, neighbor cursor)
        let mut work: Vec<(usize, usize)> = vec![(start, 0)];
        while let Some(&(node, mut cursor)) = work.last() {
            if indices[node].is_none() {
                indices[node] = Some(index_counter);
                lowlink[node] = index_counter;
                index_counter += 1;
                stack.push(node);
                on_stack[node] = true;
            }
            let neighbors: Vec<usize> = adjacency[node].iter().map(|e| e.from).collect();
            if cursor < neighbors.len() {
                let next = neighbors[cursor];
                cursor += 1;
                work.last_mut().unwrap().1 = cursor;
                if indices[next].is_none() {
                    work.push((next, 0));
                } else if on_stack[next] {
                    lowlink[node] = lowlink[node].min(indices[next].unwrap());
                }
            } else {
                work.pop();
                if let Some(&(parent, _)) = work.last() {
                    lowlink[parent] = lowlink[parent].min(lowlink[node]);
                }
                if lowlink[node] == indices[node].unwrap() {
                    let mut component = Vec::new();
                    loop {
                        let member = stack.pop().unwrap();
                        on_stack[member] = false;
                        component.push(member);
                        if member == node {
                            break;
                        }
                    }
                    sccs.push(component);
                }
            }
        }
    }
    sccs
}

fn topological_order_of_components(num_components: usize, adjacency: &[Vec<Edge>], component_of: &[usize]) -> Vec<usize> {
    let mut in_degree = vec![0usize; num_components];
    let mut dag_edges: HashSet<(usize, usize)> = HashSet::new();
    for (node, edges) in adjacency.iter().enumerate() {
        for edge in edges {
            let (from_c, to_c) = (component_of[edge.from], component_of[node]);
            if from_c != to_c {
                dag_edges.insert((from_c, to_c));
            }
        }
    }
    for &(_, to) in &dag_edges {
        in_degree[to] += 1;
    }
    let mut queue: Vec<usize> = (0..num_components).filter(|&c| in_degree[c] == 0).collect();
    let mut order = Vec::new();
    while let Some(c) = queue.pop() {
        order.push(c);
        for &(from, to) in &dag_edges {
            if from == c {
                in_degree[to] -= 1;
                if in_degree[to] == 0 {
                    queue.push(to);
                }
            }
        }
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::datalog_engine::domain::{PredicateAtom, Term};

    #[test]
    fn mutual_positive_recursion_shares_a_stratum() {
        let rules = vec![
            Rule::new(PredicateAtom::new("Reachable", vec![Term::var("s")]), vec![PredicateAtom::new("Reachable", vec![Term::var("p")]), PredicateAtom::new("Flow", vec![Term::var("p"), Term::var("s")])]),
        ];
        let strata = stratify(&rules).unwrap();
        assert_eq!(strata["Reachable"], strata["Flow"]);
    }

    #[test]
    fn negation_cycle_is_rejected() {
        let rules = vec![
            Rule::new(PredicateAtom::new("A", vec![Term::var("x")]), vec![PredicateAtom::new("B", vec![Term::var("x")])]),
            Rule::new(PredicateAtom::new("B", vec![Term::var("x")]), vec![]).with_negation(vec![PredicateAtom::new("A", vec![Term::var("x")])]),
        ];
        assert!(stratify(&rules).is_err());
    }

    #[test]
    fn negation_across_strata_is_accepted() {
        let rules = vec![
            Rule::new(PredicateAtom::new("Tainted", vec![Term::var("v")]), vec![PredicateAtom::new("TaintSource", vec![Term::var("v"), Term::var("k")])]),
            Rule::new(PredicateAtom::new("Clean", vec![Term::var("v")]), vec![PredicateAtom::new("AnyVar", vec![Term::var("v")])])
                .with_negation(vec![PredicateAtom::new("Tainted", vec![Term::var("v")])]),
        ];
        let strata = stratify(&rules).unwrap();
        assert!(strata["Clean"] > strata["Tainted"]);
    }
}
