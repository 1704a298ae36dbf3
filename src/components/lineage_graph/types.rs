use std::fmt;

use serde::{Deserialize, Serialize};

/// One end of a lineage edge: a field, labelled, grouped by its table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageNode {
	pub id: String,
	pub label: String,
	pub parent: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageEdge {
	pub from: LineageNode,
	pub to: LineageNode,
}

/// Body of `GET /table/schema/lineage`.
///
/// Both edge lists are required; an empty direction is sent as `[]`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaLineage {
	pub backward_edges: Vec<LineageEdge>,
	pub forward_edges: Vec<LineageEdge>,
}

/// Direction in which ranks advance: T = top, B = bottom, L = left, R = right.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RankDir {
	#[default]
	TopBottom,
	BottomTop,
	LeftRight,
	RightLeft,
}

impl RankDir {
	pub fn as_str(self) -> &'static str {
		match self {
			RankDir::TopBottom => "TB",
			RankDir::BottomTop => "BT",
			RankDir::LeftRight => "LR",
			RankDir::RightLeft => "RL",
		}
	}

	/// Ranks advance along the x axis.
	pub fn is_horizontal(self) -> bool {
		matches!(self, RankDir::LeftRight | RankDir::RightLeft)
	}

	/// Ranks advance towards decreasing coordinates.
	pub fn is_reversed(self) -> bool {
		matches!(self, RankDir::BottomTop | RankDir::RightLeft)
	}
}

impl fmt::Display for RankDir {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
