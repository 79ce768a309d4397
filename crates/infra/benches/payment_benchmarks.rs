use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use std::sync::Arc;

use chrono::{Duration, Utc};

use fieldbill_core::{Actor, CustomerId, InvoiceId, Money, Quantity, TenantId, UserId};
use fieldbill_infra::audit::InMemoryAuditLog;
use fieldbill_infra::comms::{
    CustomerContact, InMemoryDirectory, RecordingEmailSender, RecordingSmsSender,
};
use fieldbill_infra::service::InvoiceService;
use fieldbill_infra::store::InMemoryInvoiceStore;
use fieldbill_invoicing::{classify, LineItem, NewInvoice, PaymentMethod, PaymentRequest};

type BenchService = InvoiceService<
    Arc<InMemoryInvoiceStore>,
    Arc<RecordingEmailSender>,
    Arc<RecordingSmsSender>,
    Arc<InMemoryDirectory>,
    Arc<InMemoryAuditLog>,
>;

fn setup_service() -> (BenchService, Actor, CustomerId) {
    let store = Arc::new(InMemoryInvoiceStore::new());
    let directory = Arc::new(InMemoryDirectory::new());
    let tenant_id = TenantId::new();
    let actor = Actor::new(tenant_id, UserId::new());
    let customer_id = CustomerId::new();
    directory.put_customer(
        tenant_id,
        customer_id,
        CustomerContact {
            name: "Bench Customer".to_string(),
            email: Some("bench@example.com".to_string()),
            phone: None,
        },
    );
    directory.put_company(tenant_id, "Bench Mechanical");

    let service = InvoiceService::new(
        store,
        Arc::new(RecordingEmailSender::new()),
        Arc::new(RecordingSmsSender::new()),
        directory,
        Arc::new(InMemoryAuditLog::new()),
    );
    (service, actor, customer_id)
}

fn new_invoice(actor: Actor, customer_id: CustomerId, total_minor_units: i64) -> NewInvoice {
    let line = LineItem::new(
        "Bench line",
        Quantity::from_whole(1),
        Money::from_minor_units(total_minor_units),
    )
    .unwrap();
    NewInvoice {
        id: InvoiceId::new(),
        tenant_id: actor.tenant_id,
        customer_id,
        job_id: None,
        invoice_number: String::new(),
        line_items: vec![line],
        tax_rate_bps: 0,
        discount_amount: Money::ZERO,
        due_date: Some(Utc::now() + Duration::days(14)),
        notes: None,
    }
}

fn bench_payment_application_latency(c: &mut Criterion) {
    let mut group = c.benchmark_group("payment_application_latency");
    group.sample_size(500);

    // Benchmark: full lifecycle (draft, send, settle) per iteration
    group.bench_function("create_send_settle", |b| {
        let (service, actor, customer_id) = setup_service();
        let now = Utc::now();
        b.iter(|| {
            let invoice = service
                .create_invoice(actor, new_invoice(actor, customer_id, black_box(50_000)), now)
                .unwrap();
            service.send_invoice(actor, invoice.id(), now).unwrap();
            service
                .apply_payment(
                    actor,
                    invoice.id(),
                    PaymentRequest::new(Money::from_minor_units(50_000), PaymentMethod::Card),
                    now,
                )
                .unwrap();
        });
    });

    // Benchmark: partial payments against one long-lived invoice
    group.bench_function("apply_partial_payment", |b| {
        let (service, actor, customer_id) = setup_service();
        let now = Utc::now();
        // Large enough that the balance never runs out under the bench loop.
        let invoice = service
            .create_invoice(actor, new_invoice(actor, customer_id, 9_000_000_000_000), now)
            .unwrap();
        service.send_invoice(actor, invoice.id(), now).unwrap();

        b.iter(|| {
            service
                .apply_payment(
                    actor,
                    invoice.id(),
                    PaymentRequest::new(
                        Money::from_minor_units(black_box(1)),
                        PaymentMethod::Cash,
                    ),
                    now,
                )
                .unwrap();
        });
    });

    group.finish();
}

fn bench_overdue_classification(c: &mut Criterion) {
    let mut group = c.benchmark_group("overdue_classification");
    let now = Utc::now();

    for days in [1i64, 10, 45, 120].iter() {
        group.bench_with_input(BenchmarkId::new("classify", days), days, |b, &days| {
            let due_date = Some(now - Duration::days(days));
            let balance = Money::from_minor_units(25_000);
            b.iter(|| black_box(classify(black_box(due_date), balance, now)));
        });
    }

    group.throughput(Throughput::Elements(1_000));
    group.bench_function("classify_portfolio_1000", |b| {
        let portfolio: Vec<_> = (0..1_000)
            .map(|i| {
                (
                    Some(now - Duration::days(i % 130)),
                    Money::from_minor_units(1_000 + i),
                )
            })
            .collect();
        b.iter(|| {
            for (due_date, balance) in &portfolio {
                black_box(classify(*due_date, *balance, now));
            }
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_payment_application_latency,
    bench_overdue_classification
);
criterion_main!(benches);
