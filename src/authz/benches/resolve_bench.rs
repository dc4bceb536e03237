//! Permission resolution benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rolegate_authz::{
    AdminRoles, CachedResourceProvider, InMemoryRoleDirectory, PermissionsResolver,
    ResourceProvider, StaticResourceLoader,
};
use rolegate_core::{
    Application, Authorization, ExternalUser, Permissions, Pipeline, ServiceAccount,
};
use std::sync::Arc;
use tokio::runtime::Runtime;

const TEAMS: [&str; 4] = ["eng", "ops", "qa", "sre"];

fn create_pipelines(count: usize) -> Vec<Pipeline> {
    (0..count)
        .map(|i| {
            let pipeline = Pipeline::new(format!("p-{}", i), format!("pipeline {}", i), "checkout");
            if i % 5 == 0 {
                pipeline
            } else {
                pipeline.with_permissions(
                    Permissions::builder()
                        .add(Authorization::Read, TEAMS[i % TEAMS.len()])
                        .build(),
                )
            }
        })
        .collect()
}

fn create_resolver(resources: usize, users: usize) -> PermissionsResolver {
    let directory = Arc::new(InMemoryRoleDirectory::new());
    for i in 0..users {
        directory.set_roles(format!("user-{}", i), [TEAMS[i % TEAMS.len()]]);
    }

    let pipelines = Arc::new(CachedResourceProvider::<Pipeline>::new(
        "pipelines",
        Arc::new(StaticResourceLoader::new(create_pipelines(resources))),
    ));
    let applications = Arc::new(CachedResourceProvider::<Application>::new(
        "applications",
        Arc::new(StaticResourceLoader::new(vec![Application::new("checkout")])),
    ));
    let service_accounts = Arc::new(CachedResourceProvider::<ServiceAccount>::new(
        "service-accounts",
        Arc::new(StaticResourceLoader::new(vec![ServiceAccount::new(
            "deploy-bot",
            ["ops"],
        )])),
    ));

    let providers: Vec<Arc<dyn ResourceProvider>> = vec![
        pipelines as Arc<dyn ResourceProvider>,
        applications as Arc<dyn ResourceProvider>,
        service_accounts.clone() as Arc<dyn ResourceProvider>,
    ];

    PermissionsResolver::new(directory, service_accounts, providers, AdminRoles::new(["admin"]))
}

fn bench_single_resolution(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("resolve_single");

    for resource_count in [100, 1_000, 10_000].iter() {
        group.bench_with_input(
            BenchmarkId::new("resources", resource_count),
            resource_count,
            |b, &count| {
                let resolver = create_resolver(count, 10);

                // Load snapshots outside the measurement
                rt.block_on(async {
                    resolver.resolve("user-0").await.unwrap();
                });

                b.to_async(&rt).iter(|| async {
                    let permission = resolver.resolve(black_box("user-0")).await.unwrap();
                    black_box(permission);
                });
            },
        );
    }

    group.finish();
}

fn bench_bulk_resolution(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("resolve_all");
    group.sample_size(20);

    for user_count in [10, 100, 1_000].iter() {
        group.bench_with_input(
            BenchmarkId::new("users", user_count),
            user_count,
            |b, &count| {
                let resolver = create_resolver(1_000, count);
                let users: Vec<ExternalUser> = (0..count)
                    .map(|i| ExternalUser::new(format!("user-{}", i)))
                    .collect();

                rt.block_on(async {
                    resolver.resolve_unrestricted_user().await.unwrap();
                });

                b.to_async(&rt).iter(|| async {
                    let resolved = resolver.resolve_all(users.clone()).await.unwrap();
                    black_box(resolved);
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_single_resolution, bench_bulk_resolution);
criterion_main!(benches);
