//! 增删改执行器
//!
//! 每个操作只发出一个请求，成功时不合并返回体；列表由调用方重新拉取
//! （见 `ResourceListController::refetch_after`）。删除前的确认也由调用方负责。

use crate::api::AdminApi;
use crate::error::{ClientError, ClientResult};
use crate::request::{HttpClient, HttpMethod};
use bvs_shared::{
    EntityId, FinalizePrices, MutableResource, Order, PricingResource, Products, StatusResource,
    StatusUpdate, StockUpdate, SupportTickets, TicketReply,
};
use serde::Serialize;
use std::collections::HashMap;
use std::marker::PhantomData;
use tracing::{info, warn};

#[cfg(test)]
mod tests;

pub struct MutationExecutor<R, C> {
    api: AdminApi<C>,
    _resource: PhantomData<fn() -> R>,
}

impl<R, C> Clone for MutationExecutor<R, C> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
            _resource: PhantomData,
        }
    }
}

impl<R: MutableResource, C: HttpClient> MutationExecutor<R, C> {
    pub fn new(api: AdminApi<C>) -> Self {
        Self {
            api,
            _resource: PhantomData,
        }
    }

    /// `POST <item>`
    pub async fn create<P: Serialize + ?Sized>(&self, payload: &P) -> ClientResult<()> {
        let body = serde_json::to_value(payload)?;
        self.run("create", HttpMethod::Post, R::ITEM_PATH, Some(body)).await
    }

    /// `PUT <item>/<id>`
    pub async fn update<P: Serialize + ?Sized>(
        &self,
        id: &EntityId,
        payload: &P,
    ) -> ClientResult<()> {
        require_id::<R>("update", id)?;
        let body = serde_json::to_value(payload)?;
        self.run("update", HttpMethod::Put, &R::item_path(id), Some(body)).await
    }

    /// `DELETE <item>/<id>`
    pub async fn delete(&self, id: &EntityId) -> ClientResult<()> {
        require_id::<R>("delete", id)?;
        self.run("delete", HttpMethod::Delete, &R::item_path(id), None).await
    }

    async fn run(
        &self,
        verb: &str,
        method: HttpMethod,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> ClientResult<()> {
        let action = format!("{} {}", verb, R::NAME);
        self.run_as(&action, method, path, body).await
    }

    /// 失败时的兜底提示为 `Failed to <action>`
    async fn run_as(
        &self,
        action: &str,
        method: HttpMethod,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> ClientResult<()> {
        let resp = self.api.send(method, path, body).await?;
        if !resp.is_success() {
            let message = resp.error_message(&format!("Failed to {}", action));
            warn!(resource = R::NAME, status = resp.status, %path, %message, "mutation rejected");
            return Err(ClientError::Mutation(message));
        }
        info!(resource = R::NAME, %path, "{} succeeded", action);
        Ok(())
    }
}

impl<R: StatusResource, C: HttpClient> MutationExecutor<R, C> {
    /// `PUT <item>/<id>/status`
    pub async fn update_status(&self, id: &EntityId, status: &str) -> ClientResult<()> {
        require_id::<R>("update status of", id)?;
        let body = serde_json::to_value(StatusUpdate {
            status: status.to_string(),
        })?;
        self.run("update status of", HttpMethod::Put, &R::status_path(id), Some(body)).await
    }
}

impl<R: PricingResource, C: HttpClient> MutationExecutor<R, C> {
    /// `PUT <item>/<id>/finalize-prices`
    ///
    /// `prices` maps product id to the price per unit entered for it. Every
    /// line of the order must be priced above zero; otherwise nothing is sent.
    pub async fn finalize_prices(
        &self,
        order: &Order,
        prices: &HashMap<EntityId, f64>,
    ) -> ClientResult<()> {
        require_id::<R>("finalize prices of", &order.id)?;
        let request = FinalizePrices::for_order(order, prices)
            .map_err(|e| ClientError::Mutation(e.to_string()))?;
        let body = serde_json::to_value(request)?;
        let path = R::finalize_prices_path(&order.id);
        self.run_as("finalize prices", HttpMethod::Put, &path, Some(body)).await
    }
}

impl<C: HttpClient> MutationExecutor<Products, C> {
    /// `PATCH /api/admin/products/<id>/stock`
    pub async fn update_stock(&self, id: &EntityId, stock_quantity: f64) -> ClientResult<()> {
        if !stock_quantity.is_finite() || stock_quantity < 0.0 {
            return Err(ClientError::Mutation(
                "Stock quantity must be a non-negative number".to_string(),
            ));
        }
        require_id::<Products>("update stock of", id)?;
        let body = serde_json::to_value(StockUpdate { stock_quantity })?;
        let path = format!("{}/stock", Products::item_path(id));
        self.run("update stock of", HttpMethod::Patch, &path, Some(body)).await
    }
}

impl<C: HttpClient> MutationExecutor<SupportTickets, C> {
    /// `POST /api/admin/support/tickets/<id>/reply`
    pub async fn reply(&self, id: &EntityId, message: &str) -> ClientResult<()> {
        require_id::<SupportTickets>("reply to", id)?;
        let message = message.trim();
        if message.is_empty() {
            return Err(ClientError::Mutation("Reply message is required".to_string()));
        }
        let body = serde_json::to_value(TicketReply {
            message: message.to_string(),
        })?;
        let path = SupportTickets::reply_path(id);
        self.run("reply to", HttpMethod::Post, &path, Some(body)).await
    }

    /// `PATCH /api/admin/support/tickets/<id>/close`
    pub async fn close(&self, id: &EntityId) -> ClientResult<()> {
        require_id::<SupportTickets>("close", id)?;
        let path = SupportTickets::close_path(id);
        self.run("close", HttpMethod::Patch, &path, None).await
    }
}

/// 行数据缺少 id 时拼不出单条记录的路径
fn require_id<R: MutableResource>(verb: &str, id: &EntityId) -> ClientResult<()> {
    if id.is_empty() {
        return Err(ClientError::Mutation(format!(
            "Cannot {} {} without an id",
            verb,
            R::NAME
        )));
    }
    Ok(())
}
