//! Benchmark for request normalization, plan building and device selection

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use share_provisioner::client::views::{select_nvme, DriveEntry};
use share_provisioner::{FsType, ProvisionPayload, ProvisionPlan, ProvisionRequest};

fn bench_build_plan(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan_builder");
    group.throughput(Throughput::Elements(1));

    group.bench_function("wipe_request_to_plan", |b| {
        b.iter(|| {
            let request = ProvisionRequest::from_form(
                black_box("/dev/sdb"),
                black_box(" media "),
                Some("/mnt/media".to_string()),
                Some(FsType::Exfat),
                false,
                true,
                Some("WIPE /dev/sdb".to_string()),
            );
            let plan = ProvisionPlan::build(&request);
            let payload = ProvisionPayload::from(&request);
            black_box((plan, payload))
        });
    });

    group.bench_function("preserve_request_to_plan", |b| {
        let request =
            ProvisionRequest::from_form("/dev/nvme0n1p1", "media", None, None, false, false, None);
        b.iter(|| black_box(ProvisionPlan::build(black_box(&request))));
    });

    group.finish();
}

fn bench_select_nvme(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan_builder");

    let drives: Vec<DriveEntry> = (0..64)
        .flat_map(|i| {
            let disk = format!("/dev/nvme{}n1", i);
            let part = format!("{}p1", disk);
            [disk, part, format!("/dev/sd{}", (b'a' + (i % 26) as u8) as char)]
        })
        .map(|device| DriveEntry {
            transport: device.contains("nvme").then(|| "nvme".to_string()),
            device,
            ..Default::default()
        })
        .collect();
    group.throughput(Throughput::Elements(drives.len() as u64));

    group.bench_function("select_nvme_192_drives", |b| {
        b.iter(|| black_box(select_nvme(black_box(&drives))));
    });

    group.finish();
}

criterion_group!(benches, bench_build_plan, bench_select_nvme);
criterion_main!(benches);
