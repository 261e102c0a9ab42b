use onesettings::{
    ConfigurationProfile, FetcherConfig, ProfileFields, SettingsFetcher, SettingsRequest,
    SettingsStore,
};

pub fn main() {
    let settings_url = std::env::var("ONESETTINGS_URL").unwrap();
    let fetcher = SettingsFetcher::new(FetcherConfig::new()).unwrap();
    let store = SettingsStore::new();

    // Facts about this process. Fields filled once are never overwritten.
    let profile = ConfigurationProfile::new();
    profile.fill(
        ProfileFields::new()
            .with_os(std::env::consts::OS)
            .with_version(env!("CARGO_PKG_VERSION"))
            .with_region(std::env::var("REGION").unwrap_or_default()),
    );

    let request = SettingsRequest::new(settings_url)
        .query("namespace", "demo")
        .if_none_match(store.etag().as_deref());

    // Fetch once. A failed fetch leaves the store empty, so every feature evaluates to None.
    let snapshot = fetcher.fetch(&request);
    let next_fetch = store.apply(snapshot);

    let live_metrics = store
        .evaluate_feature("live_metrics", &profile)
        .and_then(|x| x.as_bool())
        // default value
        .unwrap_or(false);

    println!("live_metrics: {:?}", live_metrics);
    println!("next fetch in: {:?}", next_fetch);
}
