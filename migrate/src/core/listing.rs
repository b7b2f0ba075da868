//! Perl programs and argv run inside the source and destination perls.

use std::ffi::OsString;

use crate::core::types::SearchPaths;

/// Lists packlist-bearing modules via `ExtUtils::Installed`.
///
/// Arguments: `<N> <override paths (N)> <extra paths...>`. The first output
/// line is `$]`, followed by one module name per line.
pub const LISTER_PROGRAM: &str = r#"my $n = shift @ARGV;
my @only = splice @ARGV, 0, $n;
my %opts;
$opts{inc_override} = \@only if @only;
$opts{extra_libs} = [@ARGV] if @ARGV;
$| = 1;
print "$]\n";
my $installed = ExtUtils::Installed->new(%opts);
print "$_\n" for grep { $_ ne 'Perl' } $installed->modules;
"#;

/// Prints the dual-life core modules of the version given as the only argument.
///
/// Exits with [`UNKNOWN_VERSION_EXIT`] when `Module::CoreList` has no entry.
pub const CORELIST_PROGRAM: &str = r#"my $v = shift @ARGV;
my $mods = $Module::CoreList::version{$v} || $Module::CoreList::version{$v + 0};
exit 3 unless $mods;
for my $m (keys %$mods) {
    my $up = $Module::CoreList::upstream{$m};
    print "$m\n" if defined $up && $up ne 'blead';
}
"#;

pub const UNKNOWN_VERSION_EXIT: i32 = 3;

/// Environment variables that steer `@INC` and are cleared for the lister.
pub const DEFAULT_NEUTRALIZED_ENV: [&str; 3] = ["PERL5LIB", "PERLLIB", "PERL5OPT"];

/// Full argv (after the perl executable) for the module lister.
pub fn lister_args(paths: &SearchPaths) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "-MExtUtils::Installed".into(),
        "-e".into(),
        LISTER_PROGRAM.into(),
        "--".into(),
        paths.only.len().to_string().into(),
    ];
    args.extend(paths.only.iter().map(|p| p.as_os_str().to_owned()));
    args.extend(paths.extra.iter().map(|p| p.as_os_str().to_owned()));
    args
}

/// Full argv (after the perl executable) for a `Module::CoreList` lookup.
pub fn corelist_args(version: &str) -> Vec<OsString> {
    vec![
        "-MModule::CoreList".into(),
        "-e".into(),
        CORELIST_PROGRAM.into(),
        "--".into(),
        version.into(),
    ]
}
