//! 列表页的筛选与统计
//!
//! 纯函数，只读取已加载的数据，不修改数据源。

use crate::date::HistoryDate;
use std::collections::BTreeMap;

/// "不过滤" 的状态/分类取值
pub const FILTER_ALL: &str = "all";

/// 可被列表页筛选的行
pub trait Filterable {
    /// 状态或分类字段（订单的 status、商品的 category、用户的 role 等）
    fn category(&self) -> Option<&str>;

    /// 参与搜索的文本字段
    fn search_fields(&self) -> Vec<&str>;
}

/// 列表页的筛选条件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterState {
    /// `"all"` 或某个具体的状态/分类
    pub status_or_category: String,
    /// 搜索词，空字符串表示不搜索
    pub search_term: String,
    /// 历史视图日期；`ResourceListController::apply` 据此切换接口，
    /// 本模块的筛选不读取它
    pub history_date: Option<HistoryDate>,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            status_or_category: FILTER_ALL.to_string(),
            search_term: String::new(),
            history_date: None,
        }
    }
}

impl FilterState {
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status_or_category = status.into();
        self
    }

    pub fn with_search(mut self, term: impl Into<String>) -> Self {
        self.search_term = term.into();
        self
    }

    pub fn with_history_date(mut self, date: Option<HistoryDate>) -> Self {
        self.history_date = date;
        self
    }

    /// 是否对任何数据都原样返回
    pub fn is_identity(&self) -> bool {
        self.status_or_category == FILTER_ALL && self.search_term.is_empty()
    }

    /// 分类精确匹配 AND 文本不区分大小写的子串匹配
    pub fn matches<T: Filterable>(&self, item: &T) -> bool {
        if self.status_or_category != FILTER_ALL
            && item.category() != Some(self.status_or_category.as_str())
        {
            return false;
        }

        if self.search_term.is_empty() {
            return true;
        }

        let needle = self.search_term.to_lowercase();
        item.search_fields()
            .iter()
            .any(|field| field.to_lowercase().contains(&needle))
    }
}

/// 按筛选条件派生视图，保持原有顺序
pub fn filtered<'a, T: Filterable>(items: &'a [T], filter: &FilterState) -> Vec<&'a T> {
    items.iter().filter(|item| filter.matches(*item)).collect()
}

/// 按状态/分类计数（列表页顶部的统计卡片）
///
/// 没有分类字段的行不计入任何分组。
pub fn status_counts<T: Filterable>(items: &[T]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for category in items.iter().filter_map(|item| item.category()) {
        *counts.entry(category.to_string()).or_insert(0) += 1;
    }
    counts
}
