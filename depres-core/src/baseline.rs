// depres-core/src/baseline.rs
// Libraries the consuming application already ships; the downloader skips them.

use std::collections::HashSet;

use depres_common::model::Coordinate;

pub trait BaselineFilter: Send + Sync {
    /// True if the application already provides `coordinate`, in any version.
    fn provides(&self, coordinate: &Coordinate) -> bool;
}

impl<F> BaselineFilter for F
where
    F: Fn(&Coordinate) -> bool + Send + Sync,
{
    fn provides(&self, coordinate: &Coordinate) -> bool {
        self(coordinate)
    }
}

/// A fixed set of coordinates.
#[derive(Debug, Clone, Default)]
pub struct StaticBaseline {
    provided: HashSet<Coordinate>,
}

impl StaticBaseline {
    pub fn new(provided: impl IntoIterator<Item = Coordinate>) -> Self {
        Self {
            provided: provided.into_iter().collect(),
        }
    }

    /// Parses `group:artifact` entries; malformed ones are ignored.
    pub fn from_notation<'a>(entries: impl IntoIterator<Item = &'a str>) -> Self {
        Self::new(entries.into_iter().filter_map(|entry| {
            let (group, artifact) = entry.split_once(':')?;
            Some(Coordinate::new(group.trim(), artifact.trim()))
        }))
    }

    /// Libraries bundled with the MIT App Inventor companion and build server.
    pub fn app_inventor() -> Self {
        Self::from_notation(APP_INVENTOR.iter().copied())
    }

    pub fn len(&self) -> usize {
        self.provided.len()
    }

    pub fn is_empty(&self) -> bool {
        self.provided.is_empty()
    }
}

impl BaselineFilter for StaticBaseline {
    fn provides(&self, coordinate: &Coordinate) -> bool {
        self.provided.contains(coordinate)
    }
}

const APP_INVENTOR: &[&str] = &[
    "androidx.annotation:annotation",
    "androidx.appcompat:appcompat",
    "androidx.asynclayoutinflater:asynclayoutinflater",
    "androidx.cardview:cardview",
    "androidx.collection:collection",
    "androidx.constraintlayout:constraintlayout",
    "androidx.constraintlayout:constraintlayout-solver",
    "androidx.coordinatorlayout:coordinatorlayout",
    "androidx.core:core",
    "androidx.core:core-common",
    "androidx.core:core-runtime",
    "androidx.cursoradapter:cursoradapter",
    "androidx.customview:customview",
    "androidx.documentfile:documentfile",
    "androidx.drawerlayout:drawerlayout",
    "androidx.fragment:fragment",
    "androidx.interpolator:interpolator",
    "androidx.legacy:legacy-support-core-ui",
    "androidx.legacy:legacy-support-core-utils",
    "androidx.lifecycle:lifecycle-livedata",
    "androidx.lifecycle:lifecycle-livedata-core",
    "androidx.lifecycle:lifecycle-runtime",
    "androidx.lifecycle:lifecycle-viewmodel",
    "androidx.loader:loader",
    "androidx.localbroadcastmanager:localbroadcastmanager",
    "androidx.print:print",
    "androidx.recyclerview:recyclerview",
    "androidx.slidingpanelayout:slidingpanelayout",
    "androidx.swiperefreshlayout:swiperefreshlayout",
    "androidx.vectordrawable:vectordrawable",
    "androidx.vectordrawable:vectordrawable-animated",
    "androidx.versionedparcelable:versionedparcelable",
    "androidx.viewpager:viewpager",
    "ch.acra:acra",
    "com.caverock:androidsvg",
    "com.firebase:firebase-client-android",
    "com.google.api-client:google-api-client",
    "com.google.api-client:google-api-client-android2",
    "com.google.apis:google-api-services-fusiontables",
    "com.google.code.gson:gson",
    "com.google.guava:guava",
    "com.google.http-client:google-http-client",
    "com.google.http-client:google-http-client-android2",
    "com.google.http-client:google-http-client-android3",
    "com.google.oauth-client:google-oauth-client",
    "commons-codec:commons-codec",
    "commons-fileupload:commons-fileupload",
    "commons-io:commons-io",
    "net.cattaka:physicaloid",
    "org.apache.commons:commons-lang3",
    "org.apache.commons:commons-pool2",
    "org.apache.httpcomponents:httpcore",
    "org.apache.httpcomponents:httpmime",
    "org.osmdroid:osmdroid-android",
    "org.twitter4j:twitter4j-core",
    "org.twitter4j:twitter4j-media-support",
    "redis.clients:jedis",
];
