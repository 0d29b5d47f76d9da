//! Basic usage example of the mutation helpers.

use mutation_kit::{
    backend::{InMemorySwrCache, SwrCache},
    by_group, by_id, reset, BatchOptions, Mutation, MutationOptions, RawKey, StructuredKey,
    Targets, UpdateArgs,
};
use serde_json::{json, Value};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Error returned by the mock API.
#[derive(Debug)]
struct ApiError(String);

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ApiError {}

fn todos_key() -> StructuredKey {
    StructuredKey::new("todos", json!("/api/todos")).with_group("lists")
}

fn user_key(id: &str) -> StructuredKey {
    StructuredKey::new(id, json!(format!("/api/users/{}", id))).with_group("users")
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Debug)
        .try_init()
        .ok();

    println!("\n=== Mutation Kit - Basic Example ===\n");

    // 1. Initialize the cache with fetchers standing in for the API
    println!("1. Initializing in-memory SWR cache...");
    let cache = InMemorySwrCache::new();
    cache.register(todos_key(), |_| async {
        println!("  [API] GET /api/todos");
        Ok(json!([{ "id": 1, "title": "write docs" }, { "id": 2, "title": "ship" }]))
    });
    for id in ["user-1", "user-2"] {
        cache.register(user_key(id), move |_| async move {
            println!("  [API] GET /api/users/{}", id);
            Ok(json!({ "id": id }))
        });
    }
    cache.insert(todos_key(), json!([{ "id": 1, "title": "write docs" }]));
    println!("   ✓ Cache ready\n");

    // 2. Optimistic create
    println!("2. Creating a todo with an optimistic update:");
    let add_todo = Mutation::create(cache.clone(), Some(todos_key()), |todo: Value| async move {
        println!("  [API] POST /api/todos {}", todo);
        Ok::<_, ApiError>(json!({ "id": 2 }))
    })
    .with_options(MutationOptions::<Value>::default().with_optimistic_update(|current, todo| {
        let mut items = current
            .and_then(|v| v.as_array().cloned())
            .unwrap_or_default();
        items.push(todo.clone());
        Value::Array(items)
    }));

    let created = add_todo.trigger(json!({ "title": "ship" })).await?;
    println!("   ✓ Created: {:?}", created);
    println!(
        "   ✓ Cache after revalidation: {:?}\n",
        cache.get(&RawKey::from(todos_key())).await?
    );

    // 3. Failing update rolls back
    println!("3. Failing update (rolled back):");
    let offline = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&offline);
    let rename = Mutation::update(
        cache.clone(),
        Some(todos_key()),
        move |args: UpdateArgs<Value>| {
            let offline = flag.load(Ordering::SeqCst);
            async move {
                if offline {
                    Err(ApiError("Network request failed".to_string()))
                } else {
                    Ok(args.data)
                }
            }
        },
    )
    .with_options(MutationOptions::<UpdateArgs<Value>>::default().with_optimistic_update(|_, args| {
        json!([{ "id": args.id, "title": args.data["title"] }])
    }));

    match rename
        .trigger(UpdateArgs::new("1", json!({ "title": "write better docs" })))
        .await
    {
        Ok(_) => println!("   ✗ Unexpected success"),
        Err(e) => {
            println!("   ✓ {}", e.user_message());
            println!("   ✓ Network error: {}", e.is_network_error());
            println!(
                "   ✓ Cache restored: {:?}\n",
                cache.get(&RawKey::from(todos_key())).await?
            );
        }
    }
    offline.store(false, Ordering::SeqCst);

    // 4. Batch operations
    println!("4. Batch operations:");
    let matched = by_id(&cache, "user-1", Some(json!({ "id": "user-1", "name": "Ada" })), BatchOptions::default()).await?;
    println!("   ✓ by_id updated {} entries", matched);

    let matched = by_group(&cache, "users", None, BatchOptions::default()).await?;
    println!("   ✓ by_group refetched {} entries", matched);

    let cleared = reset(&cache, Some(Targets::from("todos"))).await?;
    println!("   ✓ reset cleared {} entries, kept todos\n", cleared);

    Ok(())
}
