//! 列表页控制器
//!
//! 一个控制器对应一个管理页面（订单、商品、酒店……）：负责拉取列表、
//! 维护 loading / error / items 状态、定时刷新以及历史日期切换。
//!
//! 状态通过 `tokio::sync::watch` 发布，调用方可以随时读取快照或订阅变化。
//! 同一查询的并发 `load()` 共享同一个请求；查询已经变化（切换了历史日期）
//! 或控制器已被释放时，迟到的响应会被丢弃。

use crate::api::AdminApi;
use crate::error::{ClientError, ClientResult};
use crate::request::HttpClient;
use crate::timer::Interval;
use bvs_shared::{FilterState, HistoryDate, Resource, decode_list, filtered};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};


// =========================================================
// 状态模型
// =========================================================

/// 一次增删改之后展示给用户的提示
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub is_error: bool,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            is_error: false,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            is_error: true,
        }
    }
}

/// 列表数据及其加载状态
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceCollection<T> {
    pub items: Vec<T>,
    pub loading: bool,
    pub error: Option<String>,
    /// 至少成功加载过一次
    pub loaded: bool,
    pub notice: Option<Notice>,
}

impl<T> Default for ResourceCollection<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            loading: false,
            error: None,
            loaded: false,
            notice: None,
        }
    }
}

/// 页面应该渲染哪一种界面
#[derive(Debug, Clone, PartialEq)]
pub enum PageState<T> {
    Unauthenticated,
    /// 还没有发起过加载
    Idle,
    Loading,
    Ready(Vec<T>),
    Errored(String),
}

// =========================================================
// 控制器
// =========================================================

type FetchResult<T> = Result<Arc<Vec<T>>, ClientError>;
type SharedFetch<T> = Shared<BoxFuture<'static, FetchResult<T>>>;

struct InFlight<T> {
    generation: u64,
    path: String,
    fetch: SharedFetch<T>,
}

/// `begin_load` 交给调用方去等待的请求
struct PendingLoad<T> {
    generation: u64,
    fetch: SharedFetch<T>,
}

struct Inner<T> {
    history_date: Option<HistoryDate>,
    refresh_period: Option<Duration>,
    refresh: Option<Interval>,
    in_flight: Option<InFlight<T>>,
    next_generation: u64,
}

pub struct ResourceListController<R: Resource, C> {
    api: AdminApi<C>,
    state: watch::Sender<ResourceCollection<R::Item>>,
    inner: Mutex<Inner<R::Item>>,
    this: Weak<Self>,
}

impl<R, C> ResourceListController<R, C>
where
    R: Resource,
    C: HttpClient + 'static,
{
    pub fn new(api: AdminApi<C>) -> Arc<Self> {
        let (state, _) = watch::channel(ResourceCollection::default());
        Arc::new_cyclic(|this| Self {
            api,
            state,
            inner: Mutex::new(Inner {
                history_date: None,
                refresh_period: None,
                refresh: None,
                in_flight: None,
                next_generation: 0,
            }),
            this: this.clone(),
        })
    }

    /// 当前状态快照
    pub fn state(&self) -> ResourceCollection<R::Item> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ResourceCollection<R::Item>> {
        self.state.subscribe()
    }

    pub fn page_state(&self) -> PageState<R::Item> {
        if !self.api.session().is_authenticated() {
            return PageState::Unauthenticated;
        }
        let state = self.state.borrow();
        if state.loading {
            PageState::Loading
        } else if let Some(error) = &state.error {
            PageState::Errored(error.clone())
        } else if state.loaded {
            PageState::Ready(state.items.clone())
        } else {
            PageState::Idle
        }
    }

    /// 按筛选条件派生出的可见行，不修改列表本身
    pub fn filtered(&self, filter: &FilterState) -> Vec<R::Item> {
        let state = self.state.borrow();
        filtered(&state.items, filter).into_iter().cloned().collect()
    }

    pub fn history_date(&self) -> Option<HistoryDate> {
        self.inner.lock().history_date
    }

    /// 加载筛选条件描述的视图并返回可见行
    ///
    /// 历史日期取自 `filter.history_date`，其余条件只作用于已加载的行。
    pub async fn apply(&self, filter: &FilterState) -> Vec<R::Item> {
        self.set_history_date(filter.history_date).await;
        self.filtered(filter)
    }

    // =========================================================
    // 加载
    // =========================================================

    /// 拉取列表
    ///
    /// 第一次 poll 时立即把状态置为 loading，然后发出一个 GET（选择了历史
    /// 日期时请求历史接口）。失败时错误写入状态，不会返回给调用方。
    pub async fn load(&self) {
        self.load_with(false).await;
    }

    /// 与 `load()` 相同，但不复用在途请求
    ///
    /// 在途请求可能早于一次增删改发出，它的结果会被当作过期响应丢弃。
    pub async fn reload(&self) {
        self.load_with(true).await;
    }

    async fn load_with(&self, force: bool) {
        let Some(pending) = self.begin_load(force) else {
            return;
        };
        let result = pending.fetch.await;
        self.settle(pending.generation, result);
    }

    fn begin_load(&self, force: bool) -> Option<PendingLoad<R::Item>> {
        if !self.api.session().is_authenticated() {
            warn!(resource = R::NAME, "no session, skipping load");
            return None;
        }

        let pending = {
            let mut inner = self.inner.lock();
            let path = R::list_path(inner.history_date.as_ref());
            if force && inner.in_flight.take().is_some() {
                debug!(resource = R::NAME, %path, "superseding in-flight request");
            }
            let joined = inner
                .in_flight
                .as_ref()
                .filter(|flight| flight.path == path)
                .map(|flight| PendingLoad {
                    generation: flight.generation,
                    fetch: flight.fetch.clone(),
                });
            match joined {
                Some(pending) => {
                    debug!(resource = R::NAME, %path, "joining in-flight request");
                    pending
                }
                None => {
                    inner.next_generation += 1;
                    let generation = inner.next_generation;
                    let fetch = Self::fetch(self.api.clone(), path.clone()).shared();
                    inner.in_flight = Some(InFlight {
                        generation,
                        path,
                        fetch: fetch.clone(),
                    });
                    PendingLoad { generation, fetch }
                }
            }
        };

        self.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });
        Some(pending)
    }

    fn fetch(api: AdminApi<C>, path: String) -> BoxFuture<'static, FetchResult<R::Item>> {
        async move {
            let failed = || ClientError::Fetch(format!("Failed to fetch {}", R::NAME));

            let resp = api.get(&path).await?;
            if !resp.is_success() {
                warn!(resource = R::NAME, status = resp.status, %path, "fetch failed");
                return Err(failed());
            }

            let json: serde_json::Value = resp.json().map_err(|e| {
                warn!(resource = R::NAME, error = %e, "response is not JSON");
                failed()
            })?;
            let items = decode_list::<R::Item>(json).map_err(|e| {
                warn!(resource = R::NAME, error = %e, "unexpected row shape");
                failed()
            })?;

            debug!(resource = R::NAME, count = items.len(), "fetched");
            Ok(Arc::new(items))
        }
        .boxed()
    }

    /// 应用一次请求的结果
    ///
    /// 只有与当前在途请求同代的第一个调用会生效，所以 loading 对每个请求
    /// 只会被清除一次。
    fn settle(&self, generation: u64, result: FetchResult<R::Item>) {
        let mut inner = self.inner.lock();
        if inner.in_flight.as_ref().map(|flight| flight.generation) != Some(generation) {
            debug!(resource = R::NAME, generation, "dropping superseded response");
            return;
        }
        inner.in_flight = None;

        self.state.send_modify(|state| {
            state.loading = false;
            match result {
                Ok(items) => {
                    state.items = Arc::unwrap_or_clone(items);
                    state.error = None;
                    state.loaded = true;
                }
                Err(e) => {
                    state.items.clear();
                    state.error = Some(e.to_string());
                }
            }
        });
    }

    // =========================================================
    // 历史日期
    // =========================================================

    /// 切换到某一天的历史视图（`None` 回到今天）并重新加载
    ///
    /// 选择日期会暂停自动刷新，清除日期后恢复。
    pub async fn set_history_date(&self, date: Option<HistoryDate>) {
        {
            let mut inner = self.inner.lock();
            if inner.history_date != date {
                info!(
                    resource = R::NAME,
                    date = date.map(|d| d.as_query_value()).unwrap_or_default(),
                    "switching history date"
                );
                inner.history_date = date;
                // 旧日期的响应不再属于当前查询
                inner.in_flight = None;
                self.sync_refresh(&mut inner);
            }
        }
        self.load().await;
    }

    // =========================================================
    // 自动刷新
    // =========================================================

    /// 按固定周期调用 `load()`，替换已有的定时器
    pub fn start_auto_refresh(&self, period: Duration) {
        let mut inner = self.inner.lock();
        if period.is_zero() {
            warn!(resource = R::NAME, "refresh period is zero, auto-refresh disabled");
            inner.refresh_period = None;
        } else {
            inner.refresh_period = Some(period);
        }
        inner.refresh = None;
        self.sync_refresh(&mut inner);
    }

    pub fn stop_auto_refresh(&self) {
        let mut inner = self.inner.lock();
        inner.refresh_period = None;
        if inner.refresh.take().is_some() {
            info!(resource = R::NAME, "auto-refresh stopped");
        }
    }

    pub fn is_auto_refreshing(&self) -> bool {
        self.inner.lock().refresh.is_some()
    }

    /// 定时器只在设置了周期且没有选择历史日期时运行
    fn sync_refresh(&self, inner: &mut Inner<R::Item>) {
        let period = match inner.refresh_period {
            Some(period) if inner.history_date.is_none() => period,
            _ => {
                if inner.refresh.take().is_some() {
                    info!(resource = R::NAME, "auto-refresh suspended");
                }
                return;
            }
        };
        if inner.refresh.is_some() {
            return;
        }

        info!(resource = R::NAME, period_secs = period.as_secs(), "auto-refresh started");
        let this = self.this.clone();
        inner.refresh = Some(Interval::new(period, move || {
            let this = this.clone();
            async move {
                let pending = match this.upgrade() {
                    Some(controller) => controller.begin_load(false),
                    None => return false,
                };
                if let Some(pending) = pending {
                    // 请求放在独立任务里，定时器被取消时请求仍会完成并结算
                    let weak = this.clone();
                    let driver = tokio::spawn(async move {
                        let result = pending.fetch.await;
                        if let Some(controller) = weak.upgrade() {
                            controller.settle(pending.generation, result);
                        }
                    });
                    let _ = driver.await;
                }
                this.strong_count() > 0
            }
        }));
    }

    // =========================================================
    // 增删改之后
    // =========================================================

    /// 执行一次增删改，成功后刷新一次列表
    ///
    /// 成功和失败都会写入 `notice`；失败时不触碰 `items`，也不会刷新。
    pub async fn refetch_after<F, V>(&self, mutation: F, success: &str) -> ClientResult<V>
    where
        F: Future<Output = ClientResult<V>>,
    {
        match mutation.await {
            Ok(value) => {
                self.state
                    .send_modify(|state| state.notice = Some(Notice::success(success)));
                self.reload().await;
                Ok(value)
            }
            Err(e) => {
                warn!(resource = R::NAME, error = %e, "mutation failed");
                self.state
                    .send_modify(|state| state.notice = Some(Notice::error(e.to_string())));
                Err(e)
            }
        }
    }

    pub fn clear_notice(&self) {
        self.state.send_if_modified(|state| state.notice.take().is_some());
    }
}
