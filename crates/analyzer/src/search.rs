//! 그래프 검색 -- 질의어로 루트에서 일치 노드까지의 경로 재구성
//!
//! # 질의 규칙
//!
//! - `"react"`처럼 큰따옴표로 감싸면 이름 완전 일치 (대소문자 무시)
//! - 그 외에는 부분 문자열 일치 (대소문자 무시)
//! - 2자 미만 질의는 빈 결과, 아무것도 펼치지 않음
//!
//! # 순회
//!
//! 루트의 운영 의존성, 이어서 개발 의존성에서 각각 깊이 우선 탐색을 시작합니다.
//! 명시적 스택을 사용하며, 현재 경로 위의 `(name, version)`을 다시 만나면 그 간선을
//! 끊어 순환 그래프에서도 종료를 보장합니다. 구조적으로 다른 경로는 병합하지 않습니다.
//!
//! 일치 없이 끝까지 탐색된 부분 트리(순환으로 끊긴 적이 없는 것)는 기억해 두고
//! 같은 질의 안에서 다시 펼치지 않습니다.

use std::collections::{BTreeSet, HashSet};

use serde::Serialize;
use tracing::debug;

use depscope_core::metrics as m;

use crate::graph::{Edge, PackageGraph};

/// 파싱된 질의
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// 완전 일치 (소문자)
    Exact(String),
    /// 부분 문자열 일치 (소문자)
    Substring(String),
}

impl Query {
    /// 질의 문자열을 해석합니다. 검색하지 않아야 하는 질의는 `None`입니다.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.chars().count() < 2 {
            return None;
        }
        if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
            let inner = raw[1..raw.len() - 1].trim();
            if inner.is_empty() {
                return None;
            }
            return Some(Self::Exact(inner.to_lowercase()));
        }
        Some(Self::Substring(raw.to_lowercase()))
    }

    pub fn matches(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        match self {
            Self::Exact(q) => name == *q,
            Self::Substring(q) => name.contains(q.as_str()),
        }
    }
}

/// 경로 위의 노드
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathNode {
    pub name: String,
    /// 해석된 버전, 레코드가 없으면 간선의 범위 문자열
    pub version: String,
}

/// 루트에서 일치 노드까지의 경로
pub type SearchPath = Vec<PathNode>;

/// 검색 결과
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchResult {
    /// 일치 경로 위의 모든 이름 (펼쳐야 할 조상 포함)
    pub matched_names: BTreeSet<String>,
    /// DFS 방문 순서의 경로
    pub paths: Vec<SearchPath>,
    /// 최대 경로 수에 도달하여 중단됨
    pub truncated: bool,
}

impl SearchResult {
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// 그래프 검색기
pub struct GraphSearch<'g> {
    graph: &'g PackageGraph,
    max_paths: usize,
}

impl<'g> GraphSearch<'g> {
    pub fn new(graph: &'g PackageGraph, max_paths: usize) -> Self {
        Self {
            graph,
            max_paths: max_paths.max(1),
        }
    }

    /// 질의를 실행합니다.
    pub fn search(&self, raw_query: &str) -> SearchResult {
        let Some(query) = Query::parse(raw_query) else {
            debug!(query = raw_query, "query too short, nothing expanded");
            return SearchResult::default();
        };
        metrics::counter!(m::SEARCHES_TOTAL).increment(1);

        let mut walk = Walk {
            graph: self.graph,
            query: &query,
            max_paths: self.max_paths,
            current: Vec::new(),
            on_path: HashSet::new(),
            exhausted: HashSet::new(),
            result: SearchResult::default(),
        };

        let (prod, dev) = self.graph.root_edges();
        for edge in prod.into_iter().chain(dev) {
            walk.run(edge);
        }

        debug!(
            query = raw_query,
            paths = walk.result.paths.len(),
            truncated = walk.result.truncated,
            "graph search finished"
        );
        walk.result
    }
}

type NodeKey = (String, String);

#[derive(Clone, Copy, Default)]
struct Outcome {
    found: bool,
    cut: bool,
}

struct Frame<'g> {
    key: NodeKey,
    edges: Vec<Edge<'g>>,
    next: usize,
    outcome: Outcome,
}

enum Entry<'g> {
    Entered(Frame<'g>),
    Skipped(Outcome),
}

struct Walk<'g, 'q> {
    graph: &'g PackageGraph,
    query: &'q Query,
    max_paths: usize,
    current: Vec<PathNode>,
    on_path: HashSet<NodeKey>,
    exhausted: HashSet<NodeKey>,
    result: SearchResult,
}

impl<'g> Walk<'g, '_> {
    fn run(&mut self, start: Edge<'g>) {
        let mut stack: Vec<Frame<'g>> = Vec::new();
        let mut pending = Some(start);

        loop {
            if let Some(edge) = pending.take() {
                match self.enter(edge) {
                    Entry::Entered(frame) => stack.push(frame),
                    Entry::Skipped(outcome) => absorb(stack.last_mut(), outcome),
                }
            }

            let Some(top) = stack.last_mut() else {
                break;
            };
            if top.next < top.edges.len() {
                pending = Some(top.edges[top.next]);
                top.next += 1;
                continue;
            }

            let Some(frame) = stack.pop() else {
                break;
            };
            let outcome = self.leave(frame);
            absorb(stack.last_mut(), outcome);
        }
    }

    fn enter(&mut self, edge: Edge<'g>) -> Entry<'g> {
        if self.result.truncated {
            return Entry::Skipped(Outcome {
                found: false,
                cut: true,
            });
        }

        let version = edge.target.map_or(edge.range, |r| r.version.as_str());
        let key = (edge.name.to_owned(), version.to_owned());

        if self.on_path.contains(&key) {
            return Entry::Skipped(Outcome {
                found: false,
                cut: true,
            });
        }
        if self.exhausted.contains(&key) {
            return Entry::Skipped(Outcome::default());
        }

        self.current.push(PathNode {
            name: key.0.clone(),
            version: key.1.clone(),
        });
        self.on_path.insert(key.clone());

        let mut outcome = Outcome::default();
        if self.query.matches(edge.name) {
            if self.result.paths.len() >= self.max_paths {
                self.result.truncated = true;
                outcome.cut = true;
            } else {
                self.result
                    .matched_names
                    .extend(self.current.iter().map(|n| n.name.clone()));
                self.result.paths.push(self.current.clone());
                outcome.found = true;
            }
        }

        let edges = edge
            .target
            .map(|record| self.graph.expand(record))
            .unwrap_or_default();

        Entry::Entered(Frame {
            key,
            edges,
            next: 0,
            outcome,
        })
    }

    fn leave(&mut self, frame: Frame<'g>) -> Outcome {
        self.current.pop();
        self.on_path.remove(&frame.key);
        if !frame.outcome.found && !frame.outcome.cut {
            self.exhausted.insert(frame.key);
        }
        frame.outcome
    }
}

fn absorb(parent: Option<&mut Frame<'_>>, child: Outcome) {
    if let Some(parent) = parent {
        parent.outcome.found |= child.found;
        parent.outcome.cut |= child.cut;
    }
}
