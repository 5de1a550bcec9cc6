// src/services/change_notifier.rs

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::{
    auth::Caller,
    pricing::{PriceChangeEvent, PriceType},
    tenancy::TenantType,
};

// ---
// Canais lógicos
// ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotifyChannel {
    /// Todas as empresas compradoras (mudança de preço padrão).
    AllCompanies,
    Supplier(Uuid),
    Company(Uuid),
}

impl NotifyChannel {
    pub fn is_visible_to(&self, caller: &Caller) -> bool {
        match (self, caller.tenant_type) {
            (NotifyChannel::AllCompanies, TenantType::Company) => true,
            (NotifyChannel::Company(id), TenantType::Company) => *id == caller.tenant_id,
            (NotifyChannel::Supplier(id), TenantType::Supplier) => *id == caller.tenant_id,
            _ => false,
        }
    }
}

/// Para onde cada evento vai. Preço privado nunca chega a outras empresas.
pub fn channels_for(event: &PriceChangeEvent) -> Vec<NotifyChannel> {
    match (event.price_type, event.company_id) {
        (PriceType::Default, _) => vec![
            NotifyChannel::AllCompanies,
            NotifyChannel::Supplier(event.supplier_id),
        ],
        (PriceType::Private, Some(company_id)) => vec![
            NotifyChannel::Company(company_id),
            NotifyChannel::Supplier(event.supplier_id),
        ],
        (PriceType::Private, None) => vec![NotifyChannel::Supplier(event.supplier_id)],
    }
}

/// Publicação "fire-and-forget": chamada depois do commit, nunca bloqueia
/// nem devolve erro para quem alterou o preço.
pub trait ChangeNotifier: Send + Sync {
    fn publish(&self, event: PriceChangeEvent);
}

#[derive(Debug, Clone)]
pub struct ChannelMessage {
    pub channel: NotifyChannel,
    pub event: PriceChangeEvent,
}

// ---
// Implementação com tokio::sync::broadcast (consumida pelo endpoint SSE)
// ---
#[derive(Clone)]
pub struct BroadcastNotifier {
    sender: broadcast::Sender<ChannelMessage>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChannelMessage> {
        self.sender.subscribe()
    }
}

impl ChangeNotifier for BroadcastNotifier {
    fn publish(&self, event: PriceChangeEvent) {
        for channel in channels_for(&event) {
            let message = ChannelMessage { channel, event: event.clone() };
            match self.sender.send(message) {
                Ok(receivers) => tracing::debug!(
                    product_id = %event.product_id,
                    ?channel,
                    receivers,
                    "Evento de preço publicado"
                ),
                // Sem assinantes conectados: nada a entregar.
                Err(_) => tracing::debug!(?channel, "Evento de preço sem assinantes"),
            }
        }
    }
}

/// Não entrega nada. Para ambientes sem assinantes (jobs, testes).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl ChangeNotifier for NoopNotifier {
    fn publish(&self, _event: PriceChangeEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::pricing::PRICE_UPDATED_EVENT;
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn event(price_type: PriceType, supplier_id: Uuid, company_id: Option<Uuid>) -> PriceChangeEvent {
        PriceChangeEvent {
            event: PRICE_UPDATED_EVENT.into(),
            product_id: Uuid::new_v4(),
            product_name: "Parafuso".into(),
            price_type,
            new_price: Decimal::new(9000, 2),
            currency: "USD".into(),
            supplier_id,
            company_id,
            updated_at: Utc::now(),
        }
    }

    fn caller(tenant_type: TenantType, tenant_id: Uuid) -> Caller {
        Caller { user_id: Uuid::new_v4(), tenant_id, role: "admin".into(), tenant_type }
    }

    #[test]
    fn default_price_goes_to_every_company_and_the_owner() {
        let supplier = Uuid::new_v4();
        let channels = channels_for(&event(PriceType::Default, supplier, None));
        assert_eq!(channels, vec![NotifyChannel::AllCompanies, NotifyChannel::Supplier(supplier)]);
    }

    #[test]
    fn private_price_stays_with_its_company() {
        let (supplier, company_a, company_b) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let channels = channels_for(&event(PriceType::Private, supplier, Some(company_a)));

        let visible_to = |c: &Caller| channels.iter().any(|ch| ch.is_visible_to(c));
        assert!(visible_to(&caller(TenantType::Company, company_a)));
        assert!(visible_to(&caller(TenantType::Supplier, supplier)));
        assert!(!visible_to(&caller(TenantType::Company, company_b)));
        assert!(!visible_to(&caller(TenantType::Supplier, Uuid::new_v4())));
    }

    #[test]
    fn suppliers_do_not_receive_the_all_companies_channel() {
        let supplier = caller(TenantType::Supplier, Uuid::new_v4());
        assert!(!NotifyChannel::AllCompanies.is_visible_to(&supplier));
    }

    #[tokio::test]
    async fn subscribers_receive_one_message_per_channel() {
        let notifier = BroadcastNotifier::new(8);
        let mut rx = notifier.subscribe();
        let supplier = Uuid::new_v4();

        notifier.publish(event(PriceType::Default, supplier, None));

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.channel, NotifyChannel::AllCompanies);
        assert_eq!(second.channel, NotifyChannel::Supplier(supplier));
        assert_eq!(first.event, second.event);
    }

    #[test]
    fn publishing_without_subscribers_is_harmless() {
        let notifier = BroadcastNotifier::new(1);
        notifier.publish(event(PriceType::Default, Uuid::new_v4(), None));
    }
}
