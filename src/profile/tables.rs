//! Per-project profile data.
//!
//! Paths are relative to the install root and spelled with the `.so`
//! suffix; the verifier rewrites it on other platforms.

use crate::resolver::names;

/// Static part of a project profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileSpec {
    /// Components that must be installed before this one is configured
    pub hard_deps: &'static [&'static str],
    /// Native configure flags, appended in order
    pub flags: &'static [&'static str],
    /// Executables expected in `bin/`
    pub bins: &'static [&'static str],
    /// Libraries expected in `lib/`
    pub libs: &'static [&'static str],
    /// Other expected files
    pub files: &'static [&'static str],
    /// Expected directories
    pub dirs: &'static [&'static str],
    /// Test-suite targets, run in order
    pub test_targets: &'static [&'static str],
}

impl ProfileSpec {
    const EMPTY: ProfileSpec = ProfileSpec {
        hard_deps: &[],
        flags: &[],
        bins: &[],
        libs: &[],
        files: &[],
        dirs: &[],
        test_targets: &[],
    };
}

pub const CLANG: ProfileSpec = ProfileSpec {
    hard_deps: &[names::LLVM_RUNTIMES, names::LLD, names::COMPILER_RT],
    flags: &[
        "-DCLANG_DEFAULT_LINKER=lld",
        "-DCLANG_DEFAULT_CXX_STDLIB=libc++",
        "-DCLANG_DEFAULT_RTLIB=compiler-rt",
        // clang-tblgen
        "-DLLVM_BUILD_UTILS=ON",
    ],
    bins: &[
        "clang",
        "clang++",
        "clang-cpp",
        "clang-cl",
        "clang-repl",
        "hmaptool",
        "amdgpu-arch",
        "nvptx-arch",
        "intercept-build",
        "scan-build",
        "scan-build-py",
        "scan-view",
        "analyze-build",
        "c-index-test",
        "clang-tblgen",
    ],
    libs: &[
        "libclang.so",
        "libclang-cpp.so",
        "libclangAST.a",
        "libclangCrossTU.a",
        "libclangFrontend.a",
        "libclangInterpreter.a",
        "libclangParse.a",
        "libclangTooling.a",
    ],
    files: &[],
    dirs: &["lib/cmake/clang", "lib/libear", "lib/libscanbuild", "include/clang"],
    test_targets: &["check-clang"],
};

/// Added to Clang when a `clang-tools-extra` tree sits next to it.
pub const CLANG_TOOLS_EXTRA: ProfileSpec = ProfileSpec {
    flags: &["-DLLVM_TOOL_CLANG_TOOLS_EXTRA_BUILD=ON"],
    bins: &[
        "clangd",
        "clang-tidy",
        "clang-pseudo",
        "clang-include-fixer",
        "clang-query",
        "clang-move",
        "clang-reorder-fields",
        "clang-include-cleaner",
        "clang-apply-replacements",
        "clang-change-namespace",
        "pp-trace",
        "modularize",
    ],
    libs: &[
        "libclangTidy.a",
        "libclangQuery.a",
        "libclangIncludeFixer.a",
        "libclangIncludeCleaner.a",
    ],
    ..ProfileSpec::EMPTY
};

pub const FLANG: ProfileSpec = ProfileSpec {
    hard_deps: &[names::LLD, names::COMPILER_RT],
    flags: &[
        "-DFLANG_DEFAULT_LINKER=lld",
        "-DFLANG_DEFAULT_RTLIB=compiler-rt",
    ],
    bins: &[
        "bbc",
        "flang-new",
        "flang-to-external-fc",
        "f18-parse-demo",
        "fir-opt",
        "tco",
    ],
    libs: &[
        "libFortranRuntime.a",
        "libFortranSemantics.a",
        "libFortranLower.a",
        "libFortranParser.a",
        "libFIRCodeGen.a",
        "libflangFrontend.a",
        "libFortranCommon.a",
        "libFortranDecimal.a",
        "libHLFIRDialect.a",
    ],
    ..ProfileSpec::EMPTY
};

pub const POLLY: ProfileSpec = ProfileSpec {
    libs: &["LLVMPolly.so", "libPolly.a", "libPollyISL.a"],
    dirs: &["lib/cmake/polly", "include/polly"],
    test_targets: &["check-polly"],
    ..ProfileSpec::EMPTY
};

pub const MLIR: ProfileSpec = ProfileSpec {
    flags: &["-DLLVM_BUILD_UTILS=ON", "-DMLIR_INCLUDE_TESTS=ON"],
    bins: &["mlir-tblgen", "tblgen-to-irdl", "mlir-pdll"],
    libs: &[
        "libMLIRIR.a",
        "libmlir_async_runtime.so",
        "libmlir_arm_runner_utils.so",
        "libmlir_c_runner_utils.so",
        "libmlir_float16_utils.so",
    ],
    dirs: &["lib/cmake/mlir", "include/mlir", "include/mlir-c"],
    test_targets: &["check-mlir"],
    ..ProfileSpec::EMPTY
};

pub const RUNTIMES: ProfileSpec = ProfileSpec {
    hard_deps: &[names::COMPILER_RT],
    flags: &[
        "-DLLVM_ENABLE_RUNTIMES=libunwind;libcxxabi;libcxx;openmp",
        // benchmarks need network access
        "-DLIBCXX_INCLUDE_BENCHMARKS=OFF",
        // keeps -nostdlib++ away from GCC
        "-DCXX_SUPPORTS_NOSTDLIBXX_FLAG=OFF",
        "-DLIBCXX_CXX_ABI=libcxxabi",
        "-DLIBCXX_USE_COMPILER_RT=ON",
        "-DLIBCXXABI_USE_LLVM_UNWINDER=ON",
        "-DLIBCXXABI_USE_COMPILER_RT=ON",
    ],
    libs: &[
        "libunwind.a",
        "libc++.a",
        "libc++abi.a",
        "libunwind.so",
        "libc++.so",
        "libc++abi.so",
        "libomp.so",
    ],
    files: &[
        "include/unwind.h",
        "include/libunwind.h",
        "include/mach-o/compact_unwind_encoding.h",
    ],
    dirs: &["include/c++", "include/mach-o"],
    test_targets: &["check-runtimes", "check-unwind", "check-cxx", "check-cxxabi"],
    ..ProfileSpec::EMPTY
};

pub const LLD: ProfileSpec = ProfileSpec {
    flags: &["-DLLVM_INCLUDE_TESTS=ON"],
    bins: &["lld", "ld.lld", "ld64.lld", "wasm-ld", "lld-link"],
    libs: &[
        "liblldCOFF.a",
        "liblldCommon.a",
        "liblldELF.a",
        "liblldMachO.a",
        "liblldMinGW.a",
        "liblldWasm.a",
    ],
    dirs: &["lib/cmake/lld", "include/lld"],
    test_targets: &["check-lld"],
    ..ProfileSpec::EMPTY
};

pub const LLDB: ProfileSpec = ProfileSpec {
    bins: &["lldb"],
    ..ProfileSpec::EMPTY
};

pub const COMPILER_RT: ProfileSpec = ProfileSpec {
    bins: &["hwasan_symbolize"],
    dirs: &[
        "include/sanitizer",
        "include/fuzzer",
        "include/orc",
        "include/xray",
    ],
    ..ProfileSpec::EMPTY
};

/// Sanitizer runtime archives, installed as `lib/linux/<name>-<arch>.a`.
pub const COMPILER_RT_ARCHIVES: &[&str] = &[
    "libclang_rt.asan",
    "libclang_rt.hwasan",
    "libclang_rt.lsan",
    "libclang_rt.memprof",
    "libclang_rt.xray",
    "libclang_rt.scudo_standalone",
    "libclang_rt.stats",
    "libclang_rt.tsan",
    "libclang_rt.ubsan_minimal",
];
