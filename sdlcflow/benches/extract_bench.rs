//! Benchmarks for diagram and JSON extraction.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sdlcflow::extract::{extract_diagrams, extract_json};

const DESIGN: &str = r"# Technical Design

## System Context

```mermaid
flowchart TD
    User[Customer] --> Web[Web App]
    Web --> Api[Booking API]
    Api --> Db[(PostgreSQL)]
    Api --> Pay[Payment Gateway]
```

## Booking Sequence

```mermaid
sequenceDiagram
    participant C as Customer
    participant A as Booking API
    participant P as Payment Gateway
    C->>A: POST /bookings
    A->>P: authorize(amount)
    P-->>A: authorized
    A-->>C: 201 Created
```

## Data Model

```mermaid
erDiagram
    CUSTOMER ||--o{ BOOKING : places
    ROOM ||--o{ BOOKING : reserved_by
    BOOKING ||--|| PAYMENT : settled_by
```
";

const BARE_DESIGN: &str = "Overview of the flow:\n\ngraph LR\n    A[Client] --> B[Gateway]\n    B --> C[Service]\n\nsequenceDiagram\n    A->>B: request\n    B-->>A: response\n";

const BACKLOG: &str = r#"Here is the backlog you asked for.

```json
{
  "epics": [
    {"key": "EPIC-1", "title": "Room booking", "description": "Customers book rooms online", "priority": "High"},
    {"key": "EPIC-2", "title": "Payments", "description": "Card payments at checkout", "priority": "Medium"}
  ],
  "stories": [
    {"key": "STORY-1", "epic_key": "EPIC-1", "title": "Search rooms", "acceptance_criteria": ["Filter by date", "Filter by price"]},
    {"key": "STORY-2", "epic_key": "EPIC-1", "title": "Reserve a room", "acceptance_criteria": ["Room is held for 15 minutes"]},
    {"key": "STORY-3", "epic_key": "EPIC-2", "title": "Pay by card", "acceptance_criteria": ["3-D Secure supported"]}
  ]
}
```
"#;

fn extract_benchmark(c: &mut Criterion) {
    c.bench_function("extract_diagrams_fenced", |b| {
        b.iter(|| extract_diagrams(black_box(DESIGN)));
    });

    c.bench_function("extract_diagrams_bare", |b| {
        b.iter(|| extract_diagrams(black_box(BARE_DESIGN)));
    });

    c.bench_function("extract_json_fenced", |b| {
        b.iter(|| extract_json(black_box(BACKLOG)));
    });
}

criterion_group!(benches, extract_benchmark);
criterion_main!(benches);
